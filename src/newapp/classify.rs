//! Sorting bare command line arguments into environment values, source
//! repositories, template files and component references

use super::AppConfig;
use crate::api::DockerImageReference;
use crate::app::{is_environment_argument, is_remote_repository, TemplateFileSearcher};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Why an argument was not taken as one kind of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationError {
    pub key: &'static str,
    pub value: Option<String>,
}

impl fmt::Display for ClassificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key)?;
        if let Some(value) = &self.value {
            write!(f, ": {}", value)?;
        }
        Ok(())
    }
}

/// What an argument was classified as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    Environment,
    SourceRepository,
    TemplateFile,
    Component,
}

impl fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArgumentKind::Environment => "an environment value",
            ArgumentKind::SourceRepository => "a source repository",
            ArgumentKind::TemplateFile => "a template",
            ArgumentKind::Component => "an image, image~source, or loaded template reference",
        })
    }
}

/// The outcome of classifying every bare argument.
///
/// Errors are kept per category so an unknown argument can be explained.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub environment_errors: BTreeMap<String, ClassificationError>,
    pub source_errors: BTreeMap<String, ClassificationError>,
    pub template_errors: BTreeMap<String, ClassificationError>,
    pub component_errors: BTreeMap<String, ClassificationError>,
    pub winners: BTreeMap<String, ArgumentKind>,
}

impl Classification {
    /// `Argument 'x' was classified as ...`
    pub fn describe(&self, argument: &str) -> Option<String> {
        self.winners
            .get(argument)
            .map(|kind| format!("Argument '{}' was classified as {}.", argument, kind))
    }

    /// Every reason an argument was rejected, one per line
    pub fn rejections(&self, argument: &str) -> Vec<String> {
        [
            &self.environment_errors,
            &self.source_errors,
            &self.template_errors,
            &self.component_errors,
        ]
        .iter()
        .filter_map(|errors| errors.get(argument))
        .map(|err| format!("{:?} {}", argument, err))
        .collect()
    }
}

/// Checks the `image~source` / `a+b` component grammar
pub fn is_component_reference(s: &str) -> Result<(), String> {
    if s.is_empty() {
        return Err("empty string provided to component reference check".to_string());
    }
    for segment in s.split('+') {
        if segment.is_empty() {
            return Err(format!("component reference {:?} had a zero-length component", s));
        }
        let image = match segment.split_once('~') {
            Some(("", _)) => {
                return Err(format!(
                    "when using '[image]~[code]' form for {:?}, you must specify a image name",
                    segment
                ))
            }
            Some((image, _)) => image,
            None => segment,
        };
        if image.starts_with(['/', '.']) {
            return Err(format!("{:?} looks like a file path, not an image reference", image));
        }
        DockerImageReference::parse(image)
            .map_err(|err| format!("{:?} is not a valid image reference: {}", image, err))?;
    }
    Ok(())
}

impl AppConfig {
    fn try_environment(&mut self, s: &str) -> bool {
        if is_environment_argument(s) {
            debug!(argument = s, "treating as environment argument");
            self.generation.environment.push(s.to_string());
            return true;
        }
        self.classification.environment_errors.insert(
            s.to_string(),
            ClassificationError {
                key: "is not an environment variable",
                value: None,
            },
        );
        false
    }

    fn try_source(&mut self, s: &str) -> bool {
        if is_remote_repository(s) || self.fs().is_dir(Path::new(s)) {
            debug!(argument = s, "treating as source repository");
            self.inputs.source_repositories.push(s.to_string());
            return true;
        }
        self.classification.source_errors.insert(
            s.to_string(),
            ClassificationError {
                key: "is not a Git repository",
                value: Some("not a remote URL and not a local directory".to_string()),
            },
        );
        false
    }

    fn try_template_file(&mut self, s: &str) -> bool {
        if !self.fs().is_file(Path::new(s)) {
            return false;
        }
        let searcher = TemplateFileSearcher {
            fs: Arc::clone(self.fs()),
        };
        match searcher.load(s) {
            Ok(_) => {
                debug!(argument = s, "treating as template file");
                self.inputs.components.push(s.to_string());
                true
            }
            Err(err) => {
                self.classification.template_errors.insert(
                    s.to_string(),
                    ClassificationError {
                        key: "is not a template stored in a local file",
                        value: Some(err.to_string()),
                    },
                );
                false
            }
        }
    }

    fn try_component(&mut self, s: &str) -> bool {
        match is_component_reference(s) {
            Ok(()) => {
                debug!(argument = s, "treating as component reference");
                self.inputs.components.push(s.to_string());
                true
            }
            Err(err) => {
                self.classification.component_errors.insert(
                    s.to_string(),
                    ClassificationError {
                        key: "is not an image reference, image~source reference, nor template loaded in an accessible project",
                        value: Some(err),
                    },
                );
                false
            }
        }
    }

    /// Sorts bare arguments into their inputs and returns the ones that fit
    /// no category.
    ///
    /// Each argument is tried as an environment value, a source repository,
    /// a template file and finally a component reference.
    pub fn add_arguments(&mut self, args: &[String]) -> Vec<String> {
        let mut unknown = Vec::new();
        for s in args.iter().filter(|s| !s.is_empty()) {
            let kind = if self.try_environment(s) {
                ArgumentKind::Environment
            } else if self.try_source(s) {
                self.classification.environment_errors.remove(s);
                ArgumentKind::SourceRepository
            } else if self.try_template_file(s) {
                self.classification.environment_errors.remove(s);
                self.classification.source_errors.remove(s);
                ArgumentKind::TemplateFile
            } else if self.try_component(s) {
                // source errors stay in case this was meant as a repository
                self.classification.environment_errors.remove(s);
                self.classification.template_errors.remove(s);
                ArgumentKind::Component
            } else {
                debug!(argument = %s, "treating as unknown");
                unknown.push(s.clone());
                continue;
            };
            self.classification.winners.insert(s.clone(), kind);
        }
        unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GitCli;
    use crate::fs::MockFileSystem;
    use std::rc::Rc;
    use yare::parameterized;

    fn config(fs: MockFileSystem) -> AppConfig {
        AppConfig::new(Arc::new(fs), Rc::new(GitCli))
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[parameterized(
        image = { "ruby" },
        tagged = { "openshift/ruby:2.5" },
        with_source = { "ruby~https://github.com/openshift/ruby-hello-world.git" },
        joined = { "mysql+ruby~./app" },
    )]
    fn test_component_references(value: &str) {
        assert!(is_component_reference(value).is_ok());
    }

    #[parameterized(
        empty = { "" },
        empty_segment = { "mysql+" },
        missing_image = { "~./app" },
        uppercase = { "Ruby" },
    )]
    fn test_invalid_component_references(value: &str) {
        assert!(is_component_reference(value).is_err());
    }

    #[test]
    fn test_arguments_are_classified_in_order() {
        let fs = MockFileSystem::new();
        fs.add_dir("/mock/app");
        fs.add_file(
            "/mock/template.json",
            r#"{"kind": "Template", "metadata": {"name": "sample"}, "objects": []}"#,
        );
        fs.add_file("/mock/notes.txt", "not a template");
        let mut config = config(fs);

        let unknown = config.add_arguments(&strings(&[
            "A=b",
            "/mock/app",
            "https://github.com/openshift/ruby-hello-world.git",
            "/mock/template.json",
            "mysql",
            "/mock/notes.txt",
            "Not Valid",
        ]));

        assert_eq!(config.generation.environment, strings(&["A=b"]));
        assert_eq!(
            config.inputs.source_repositories,
            strings(&["/mock/app", "https://github.com/openshift/ruby-hello-world.git"])
        );
        assert_eq!(config.inputs.components, strings(&["/mock/template.json", "mysql"]));
        assert_eq!(unknown, strings(&["/mock/notes.txt", "Not Valid"]));

        assert_eq!(
            config.classification.winners.get("mysql"),
            Some(&ArgumentKind::Component)
        );
        assert!(config.classification.describe("A=b").unwrap().contains("environment"));
        assert!(!config.classification.environment_errors.contains_key("/mock/app"));
        assert!(config.classification.source_errors.contains_key("mysql"));
        assert!(config.classification.template_errors.contains_key("/mock/notes.txt"));
        assert_eq!(config.classification.rejections("Not Valid").len(), 3);
    }
}
