use super::errors::ResolveError;
use super::matches::{ComponentMatch, ComponentMatches, MatchPayload};
use super::scorer::{string_proximity_scorer, SCORE_THRESHOLD};
use super::search::Searcher;
use crate::api::Template;
use crate::client::TemplateClient;
use crate::fs::FileSystem;
use serde_json::Value;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace};

/// Finds templates by name across an ordered list of namespaces
pub struct TemplateSearcher {
    pub client: Rc<dyn TemplateClient>,
    pub namespaces: Vec<String>,
}

impl Searcher for TemplateSearcher {
    fn search(&self, precise: bool, terms: &[&str]) -> Result<ComponentMatches, ResolveError> {
        let mut results = ComponentMatches::new();
        for term in terms {
            let (namespaces, name) = match term.split_once('/') {
                Some((namespace, name)) => (vec![namespace.to_string()], name),
                None => {
                    let mut namespaces: Vec<String> = Vec::new();
                    for ns in &self.namespaces {
                        if !namespaces.contains(ns) {
                            namespaces.push(ns.clone());
                        }
                    }
                    (namespaces, *term)
                }
            };

            for namespace in &namespaces {
                let templates = match self.client.list_templates(namespace) {
                    Ok(templates) => templates,
                    Err(err) if err.is_not_found_or_forbidden() => {
                        debug!(namespace, error = %err, "skipping namespace");
                        continue;
                    }
                    Err(err) => return Err(ResolveError::lookup(term, err)),
                };

                let mut exact = false;
                for template in templates {
                    let score = string_proximity_scorer(template.name(), name);
                    if score >= SCORE_THRESHOLD {
                        continue;
                    }
                    trace!(term, template = template.name(), score, "template match");
                    exact |= score == 0.0;
                    let full = format!("{}/{}", namespace, template.name());
                    results.push(ComponentMatch {
                        value: term.to_string(),
                        argument: format!("--template={:?}", full),
                        description: format!(
                            "Template {:?} in project {:?}",
                            template.name(),
                            namespace
                        ),
                        name: full,
                        score,
                        payload: Some(MatchPayload::Template(Box::new(template))),
                        ..Default::default()
                    });
                }
                if precise && exact {
                    break;
                }
            }
        }
        Ok(results.sorted())
    }
}

/// Loads templates from JSON or YAML files named on the command line
pub struct TemplateFileSearcher {
    pub fs: Arc<dyn FileSystem>,
}

impl TemplateFileSearcher {
    pub fn load(&self, path: &str) -> Result<Template, ResolveError> {
        let failed = |message: String| ResolveError::TemplateFile {
            path: path.to_string(),
            message,
        };
        let unable = |reason: String| failed(format!("unable to load template file {:?}: {}", path, reason));

        let content = self
            .fs
            .read_to_string(Path::new(path))
            .map_err(|err| unable(err.to_string()))?;
        let value: Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(_) => serde_yaml::from_str(&content).map_err(|err| unable(err.to_string()))?,
        };

        let object = if value.get("kind").and_then(Value::as_str) == Some("List") {
            match value.get("items").and_then(Value::as_array) {
                Some(items) if items.len() == 1 => items[0].clone(),
                _ => return Err(failed(format!("there is more than one object in {:?}", path))),
            }
        } else {
            value
        };
        if object.get("kind").and_then(Value::as_str) != Some("Template") {
            return Err(failed(format!("object in {:?} is not a template", path)));
        }
        serde_json::from_value(object).map_err(|err| unable(err.to_string()))
    }
}

impl Searcher for TemplateFileSearcher {
    fn search(&self, _precise: bool, terms: &[&str]) -> Result<ComponentMatches, ResolveError> {
        let mut results = ComponentMatches::new();
        for term in terms {
            if *term == "*" || !self.fs.is_file(Path::new(term)) {
                continue;
            }
            let template = self.load(term)?;
            debug!(path = term, template = template.name(), "loaded template file");
            results.push(ComponentMatch {
                value: term.to_string(),
                name: if template.name().is_empty() {
                    term.to_string()
                } else {
                    template.name().to_string()
                },
                argument: format!("--file={:?}", term),
                description: format!("Template file {}", term),
                score: 0.0,
                payload: Some(MatchPayload::Template(Box::new(template))),
                ..Default::default()
            });
        }
        Ok(results)
    }

    fn loads_file(&self, value: &str) -> bool {
        self.fs.is_file(Path::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ObjectMeta;
    use crate::client::Catalog;
    use crate::fs::MockFileSystem;

    fn template(namespace: &str, name: &str) -> Template {
        let mut meta = ObjectMeta::named(name);
        meta.namespace = namespace.to_string();
        Template::new(meta)
    }

    #[test]
    fn test_template_search_by_name_and_namespace() {
        let catalog = Catalog::default()
            .with_template(template("myproject", "rails-postgresql"))
            .with_template(template("openshift", "rails-postgresql"))
            .with_template(template("openshift", "rails"));
        let searcher = TemplateSearcher {
            client: Rc::new(catalog),
            namespaces: vec!["openshift".into(), "myproject".into(), "openshift".into()],
        };

        let matches = searcher.search(false, &["rails"]).unwrap();
        assert_eq!(matches.len(), 3);
        let best = matches.first().unwrap();
        assert_eq!(best.name, "openshift/rails");
        assert_eq!(best.argument, "--template=\"openshift/rails\"");
        assert!(best.is_template());

        let matches = searcher.search(true, &["myproject/rails-postgresql"]).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches.first().unwrap().name, "myproject/rails-postgresql");
    }

    #[test]
    fn test_template_file_loads_single_item_lists() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/mock/list.json",
            r#"{"kind": "List", "items": [{"kind": "Template", "metadata": {"name": "app"}}]}"#,
        );
        fs.add_file("/mock/app.yaml", "kind: Template\nmetadata:\n  name: app-yaml\n");
        let searcher = TemplateFileSearcher { fs: Arc::new(fs) };

        let matches = searcher.search(true, &["/mock/list.json", "/mock/missing.json"]).unwrap();
        assert_eq!(matches.len(), 1);
        let m = matches.first().unwrap();
        assert_eq!(m.name, "app");
        assert_eq!(m.argument, "--file=\"/mock/list.json\"");

        let matches = searcher.search(true, &["/mock/app.yaml"]).unwrap();
        assert_eq!(matches.first().unwrap().name, "app-yaml");
    }

    #[test]
    fn test_template_file_errors() {
        let fs = MockFileSystem::new();
        fs.add_file("/mock/pod.json", r#"{"kind": "Pod"}"#);
        fs.add_file(
            "/mock/many.json",
            r#"{"kind": "List", "items": [{"kind": "Template"}, {"kind": "Template"}]}"#,
        );
        let searcher = TemplateFileSearcher { fs: Arc::new(fs) };

        let err = searcher.search(true, &["/mock/pod.json"]).unwrap_err();
        assert_eq!(err.to_string(), "object in \"/mock/pod.json\" is not a template");
        let err = searcher.search(true, &["/mock/many.json"]).unwrap_err();
        assert!(err.to_string().contains("more than one object"));
        assert!(searcher.loads_file("/mock/pod.json"));
        assert!(!searcher.loads_file("/mock"));
    }
}
