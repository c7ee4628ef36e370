//! appgen - generates application definitions from images, templates and
//! source code
//!
//! Given a list of loosely typed arguments (image names, image stream
//! references, template names or files, source repositories, `image~source`
//! pairs) the engine classifies them, resolves each one against the available
//! image and template sources and emits the objects that build and deploy the
//! result: image streams, build configs, deployment configs and services.
//!
//! # Core Concepts
//!
//! - **Searchers and resolvers**: a [`app::Searcher`] returns scored
//!   candidates for a term; a [`app::Resolver`] applies a policy (exact only,
//!   highest score, weighted tiers) to pick one
//! - **Source detection**: repositories are inspected for a Dockerfile or
//!   language markers to choose a build strategy and a builder image
//! - **Pipelines**: each resolved component becomes an optional build plus
//!   an optional deployment, grouped with `+` into shared deployments
//!
//! # Example Usage
//!
//! ```no_run
//! use appgen::client::{Catalog, GitCli, ImageStreamClient, RegistryClient, TemplateClient};
//! use appgen::fs::RealFileSystem;
//! use appgen::newapp::AppConfig;
//! use std::rc::Rc;
//! use std::sync::Arc;
//!
//! let catalog = Rc::new(Catalog::from_path(std::path::Path::new("catalog.yaml")).unwrap());
//! let mut app = AppConfig::new(Arc::new(RealFileSystem::new()), Rc::new(GitCli));
//! app.set_cluster_clients(
//!     Rc::clone(&catalog) as Rc<dyn ImageStreamClient>,
//!     Rc::clone(&catalog) as Rc<dyn TemplateClient>,
//!     "myproject",
//!     "openshift",
//! );
//! app.set_docker_clients(None, catalog as Rc<dyn RegistryClient>);
//! app.add_arguments(&["ruby~https://github.com/openshift/ruby-hello-world.git".to_string()]);
//!
//! let result = app.run().unwrap();
//! println!("{}", serde_yaml::to_string(&result.list).unwrap());
//! ```
//!
//! # Project Structure
//!
//! - [`api`]: the generated object model
//! - [`app`]: searchers, resolvers, component references and pipelines
//! - [`newapp`]: argument classification and the end-to-end flow
//! - [`detect`]: source repository inspection
//! - [`client`]: Docker, registry, cluster and Git collaborators
//! - [`fs`]: file system abstraction with an in-memory mock

pub mod api;
pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod detect;
pub mod fs;
pub mod newapp;
pub mod util;

pub use config::{AppgenConfig, ConfigError};
pub use newapp::{AppConfig, AppResult, NewAppError, QueryResult};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_appgen() {
        assert_eq!(NAME, "appgen");
    }
}
