//! Output formatting for generated objects and search results
//!
//! Object lists are printed as YAML or JSON on stdout. Search results and the
//! human summary of a run are plain text.

use anyhow::{Context, Result};
use std::fmt::Write as _;

use crate::api::{Object, ObjectList};
use crate::app::ComponentMatch;
use crate::newapp::AppResult;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// YAML format (default)
    Yaml,
    /// JSON format
    Json,
}

/// Output formatter for object lists
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Serializes the list in the configured format
    pub fn format_list(&self, list: &ObjectList) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(list).context("Failed to serialize object list to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(list).context("Failed to serialize object list to YAML")
            }
        }
    }

    /// Search results grouped into templates, image streams and images
    pub fn format_matches(&self, matches: &[ComponentMatch]) -> String {
        let templates: Vec<_> = matches.iter().filter(|m| m.is_template()).collect();
        let streams: Vec<_> = matches.iter().filter(|m| m.image_stream().is_some()).collect();
        let images: Vec<_> = matches
            .iter()
            .filter(|m| m.is_image() && m.image_stream().is_none())
            .collect();

        let mut output = String::new();
        for (title, group) in [
            ("Templates", &templates),
            ("Image streams", &streams),
            ("Docker images", &images),
        ] {
            if group.is_empty() {
                continue;
            }
            let _ = writeln!(output, "{} ({})", title, group.len());
            output.push_str(&"\u{2500}".repeat(title.len()));
            output.push('\n');
            for m in group {
                let _ = writeln!(output, "{}", m.name);
                if !m.description.is_empty() {
                    let _ = writeln!(output, "  {}", m.description);
                }
                let _ = writeln!(output, "  {}", m.argument);
                if !m.exact() {
                    let _ = writeln!(output, "  (score {:.2})", m.score);
                }
                output.push('\n');
            }
        }
        if output.is_empty() {
            output.push_str("No matches found\n");
        }
        output
    }

    /// One line per generated object, for interactive terminals
    pub fn format_summary(&self, result: &AppResult) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "\u{2713} Generated \"{}\" in namespace {}", result.name, result.namespace);
        output.push_str(&"\u{2501}".repeat(42));
        output.push('\n');

        let count = result.list.items.len();
        for (i, object) in result.list.items.iter().enumerate() {
            let connector = if i + 1 == count { "\u{2514}" } else { "\u{251C}" };
            let _ = writeln!(output, "{}\u{2500} {} \"{}\"", connector, object.kind(), object.name());
        }

        let services: Vec<&str> = result
            .list
            .items
            .iter()
            .filter_map(|o| match o {
                Object::Service(s) => Some(s.metadata.name.as_str()),
                _ => None,
            })
            .collect();
        if !services.is_empty() {
            let _ = writeln!(output, "\nServices: {}", services.join(", "));
        }
        if result.has_source {
            output.push_str("\nBuilds start once the objects are created.\n");
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ImageStream, ObjectMeta, Template};
    use crate::app::MatchPayload;

    fn list() -> ObjectList {
        ObjectList::new(vec![Object::ImageStream(ImageStream::new(ObjectMeta::named("ruby")))])
    }

    #[test]
    fn test_yaml_list() {
        let output = OutputFormatter::new(OutputFormat::Yaml).format_list(&list()).unwrap();
        assert!(output.contains("kind: List"));
        assert!(output.contains("name: ruby"));
    }

    #[test]
    fn test_json_list() {
        let output = OutputFormatter::new(OutputFormat::Json).format_list(&list()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["kind"], "List");
        assert_eq!(value["items"][0]["kind"], "ImageStream");
    }

    #[test]
    fn test_matches_are_grouped() {
        let template = ComponentMatch {
            name: "rails-postgresql".to_string(),
            argument: "--template=\"rails-postgresql\"".to_string(),
            description: "Rails with PostgreSQL".to_string(),
            payload: Some(MatchPayload::Template(Box::new(Template::new(ObjectMeta::named(
                "rails-postgresql",
            ))))),
            ..Default::default()
        };
        let image = ComponentMatch {
            name: "mysql".to_string(),
            argument: "--docker-image=\"mysql\"".to_string(),
            score: 0.5,
            ..Default::default()
        };

        let output = OutputFormatter::new(OutputFormat::Yaml).format_matches(&[template, image]);
        assert!(output.contains("Templates (1)"));
        assert!(output.contains("Rails with PostgreSQL"));
        assert!(output.contains("Docker images (1)"));
        assert!(output.contains("(score 0.50)"));
        assert!(!output.contains("Image streams"));
    }

    #[test]
    fn test_no_matches() {
        let output = OutputFormatter::new(OutputFormat::Yaml).format_matches(&[]);
        assert_eq!(output, "No matches found\n");
    }
}
