//! End-to-end generation against an in-memory catalog, file system and git

use anyhow::Result;
use appgen::api::Object;
use appgen::client::{Catalog, Git, ImageStreamClient, RegistryClient, TemplateClient};
use appgen::fs::MockFileSystem;
use appgen::newapp::AppConfig;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

const CATALOG: &str = r#"
imageStreams:
  - metadata: {name: ruby, namespace: openshift}
    spec:
      tags:
        - name: latest
          annotations: {supports: "ruby", tags: "builder,ruby"}
    status:
      tags:
        - tag: latest
          items: [{image: "sha256:ruby"}]
images:
  "sha256:ruby":
    id: "sha256:ruby"
    config:
      exposedPorts: ["8080/tcp"]
      labels: {"io.openshift.s2i.scripts-url": "image:///usr/libexec/s2i"}
registry:
  - name: mysql
    tag: latest
    image:
      id: "sha256:mysql"
      config:
        exposedPorts: ["3306/tcp"]
"#;

struct FakeGit;

impl Git for FakeGit {
    fn root_dir(&self, _dir: &Path) -> Result<PathBuf> {
        Ok(PathBuf::from("/mock/app"))
    }

    fn origin_url(&self, _dir: &Path) -> Result<Option<String>> {
        Ok(Some("https://github.com/example/hello.git".to_string()))
    }

    fn current_ref(&self, _dir: &Path) -> String {
        "main".to_string()
    }

    fn clone_repo(&self, _url: &str, _dir: &Path) -> Result<()> {
        Ok(())
    }

    fn checkout(&self, _dir: &Path, _git_ref: &str) -> Result<()> {
        Ok(())
    }
}

fn app(arguments: &[&str]) -> AppConfig {
    let fs = MockFileSystem::new();
    fs.add_dir("/mock/app");
    fs.add_file("/mock/app/Gemfile", "source 'https://rubygems.org'\ngem 'rack'\n");

    let catalog = Rc::new(Catalog::from_yaml(CATALOG).unwrap());
    let mut app = AppConfig::new(Arc::new(fs), Rc::new(FakeGit));
    app.set_cluster_clients(
        Rc::clone(&catalog) as Rc<dyn ImageStreamClient>,
        Rc::clone(&catalog) as Rc<dyn TemplateClient>,
        "default",
        "openshift",
    );
    app.set_docker_clients(None, catalog as Rc<dyn RegistryClient>);

    let arguments: Vec<String> = arguments.iter().map(|a| a.to_string()).collect();
    let unknown = app.add_arguments(&arguments);
    assert!(unknown.is_empty(), "unclassified arguments: {:?}", unknown);
    app
}

fn kinds_and_names(items: &[Object]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|o| (o.kind().to_string(), o.name().to_string()))
        .collect()
}

fn build_config(items: &[Object]) -> &appgen::api::BuildConfig {
    items
        .iter()
        .find_map(|o| match o {
            Object::BuildConfig(bc) => Some(bc),
            _ => None,
        })
        .expect("a build config is generated")
}

#[test]
fn test_registry_image_is_deployed() {
    let result = app(&["mysql"]).run().unwrap();

    assert_eq!(result.name, "mysql");
    assert!(!result.has_source);
    let objects = kinds_and_names(&result.list.items);
    assert!(objects.contains(&("ImageStream".to_string(), "mysql".to_string())));
    assert!(objects.contains(&("DeploymentConfig".to_string(), "mysql".to_string())));
    assert!(objects.contains(&("Service".to_string(), "mysql".to_string())));
    assert!(!objects.iter().any(|(kind, _)| kind == "BuildConfig"));

    let service = result
        .list
        .items
        .iter()
        .find_map(|o| match o {
            Object::Service(s) => Some(s),
            _ => None,
        })
        .unwrap();
    assert_eq!(service.spec.ports[0].port, 3306);
    assert_eq!(service.spec.ports[0].name, "3306-tcp");
}

#[test]
fn test_explicit_builder_with_local_source() {
    let result = app(&["ruby~/mock/app"]).run().unwrap();

    assert_eq!(result.name, "hello");
    assert!(result.has_source);
    let objects = kinds_and_names(&result.list.items);
    assert!(objects.contains(&("ImageStream".to_string(), "hello".to_string())));
    assert!(objects.contains(&("BuildConfig".to_string(), "hello".to_string())));
    assert!(objects.contains(&("DeploymentConfig".to_string(), "hello".to_string())));
    assert!(objects.contains(&("Service".to_string(), "hello".to_string())));

    let bc = build_config(&result.list.items);
    let git = bc.spec.source.git.as_ref().unwrap();
    assert_eq!(git.uri, "https://github.com/example/hello.git");
    assert_eq!(git.git_ref, "main");
    let from = &bc.spec.strategy.source_strategy.as_ref().unwrap().from;
    assert_eq!(from.kind, "ImageStreamTag");
    assert_eq!(from.name, "ruby:latest");
    assert_eq!(from.namespace, "openshift");
}

#[test]
fn test_builder_is_detected_from_source() {
    let result = app(&["/mock/app"]).run().unwrap();

    let bc = build_config(&result.list.items);
    let from = &bc.spec.strategy.source_strategy.as_ref().unwrap().from;
    assert_eq!(from.name, "ruby:latest");
    assert_eq!(from.namespace, "openshift");
}

#[test]
fn test_name_overrides_generated_names() {
    let mut app = app(&["mysql"]);
    app.generation.name = "db".to_string();
    let result = app.run().unwrap();

    assert_eq!(result.name, "db");
    let objects = kinds_and_names(&result.list.items);
    assert!(objects.contains(&("DeploymentConfig".to_string(), "db".to_string())));
}

#[test]
fn test_invalid_name_is_rejected() {
    let mut app = app(&["mysql"]);
    app.generation.name = "Not_Valid".to_string();
    let err = app.run().unwrap_err();
    assert!(err.to_string().contains("invalid name: Not_Valid"));
}

#[test]
fn test_unknown_image_has_no_match() {
    let err = app(&["doesnotexist"]).run().unwrap_err();
    assert!(err.to_string().contains("doesnotexist"));
}

#[test]
fn test_no_inputs() {
    let err = app(&[]).run().unwrap_err();
    assert_eq!(err.to_string(), "no inputs provided");
}

#[test]
fn test_search_finds_image_stream() {
    let mut app = app(&["ruby"]);
    app.as_search = true;
    let result = app.run_query().unwrap();

    assert!(result
        .matches
        .iter()
        .any(|m| m.image_stream().map(|s| s.metadata.name.as_str()) == Some("ruby")));
    assert!(result
        .list
        .items
        .iter()
        .any(|o| o.kind() == "ImageStream" && o.name() == "ruby"));
}

#[test]
fn test_list_and_search_are_exclusive() {
    let mut app = app(&[]);
    app.as_search = true;
    app.as_list = true;
    let err = app.run_query().unwrap_err();
    assert!(err.to_string().contains("can't be used together"));
}
