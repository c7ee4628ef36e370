//! External collaborators
//!
//! The engine talks to the Docker daemon, image registries, the orchestrator
//! API and git only through the traits in this module. Adapters translate
//! their native failures into [`ClientError`] so searchers can tell
//! "not found" apart from real failures without seeing transport types.

mod catalog;
mod docker;
mod git;
mod orchestrator;
mod registry;

pub use catalog::{Catalog, RegistryImage};
pub use docker::{BollardDockerClient, DockerClient, LocalImage};
pub use git::{Git, GitCli};
pub use orchestrator::{ImageStreamClient, TemplateClient};
pub use registry::{RegistryClient, RegistryConnection};

use thiserror::Error;

/// Failure reported by an external collaborator
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{kind} {name:?} not found")]
    NotFound { kind: String, name: String },

    #[error("access to {0} is forbidden")]
    Forbidden(String),

    #[error("registry {0:?} could not be found")]
    RegistryNotFound(String),

    #[error("{service} is unavailable: {message}")]
    Unavailable { service: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClientError {
    pub fn not_found(kind: &str, name: impl Into<String>) -> Self {
        ClientError::NotFound {
            kind: kind.to_string(),
            name: name.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }

    /// Not found or forbidden; lookups treat both as an empty answer
    pub fn is_not_found_or_forbidden(&self) -> bool {
        matches!(self, ClientError::NotFound { .. } | ClientError::Forbidden(_))
    }
}
