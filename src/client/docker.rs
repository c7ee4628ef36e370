use super::ClientError;
use crate::api::{ImageConfig, ImageMetadata};
use bollard::errors::Error as BollardError;
use bollard::image::ListImagesOptions;
use bollard::Docker;
use std::env;
use std::path::Path;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

const DOCKER_SOCKET_PATH: &str = "/var/run/docker.sock";

/// An image known to the local daemon
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalImage {
    pub id: String,
    pub repo_tags: Vec<String>,
}

/// The subset of the Docker daemon API the engine needs
pub trait DockerClient {
    fn list_images(&self) -> Result<Vec<LocalImage>, ClientError>;

    /// Fails with [`ClientError::NotFound`] when the daemon has no such image
    fn inspect_image(&self, name: &str) -> Result<ImageMetadata, ClientError>;
}

/// DockerClient backed by the local daemon socket.
///
/// The engine is synchronous, so each call is driven to completion on a
/// private current-thread runtime.
pub struct BollardDockerClient {
    docker: Docker,
    runtime: Runtime,
}

impl BollardDockerClient {
    /// Connects to the daemon named by `DOCKER_HOST`, or the default socket
    pub fn connect() -> Result<Self, ClientError> {
        if env::var("DOCKER_HOST").is_err() && !Path::new(DOCKER_SOCKET_PATH).exists() {
            debug!("Docker socket not found at {}", DOCKER_SOCKET_PATH);
            return Err(ClientError::Unavailable {
                service: "docker".to_string(),
                message: format!("no socket at {}", DOCKER_SOCKET_PATH),
            });
        }

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ClientError::Other(e.into()))?;
        let docker = {
            let _guard = runtime.enter();
            Docker::connect_with_local_defaults().map_err(|e| ClientError::Unavailable {
                service: "docker".to_string(),
                message: e.to_string(),
            })?
        };

        Ok(Self { docker, runtime })
    }
}

fn translate(err: BollardError, name: &str) -> ClientError {
    match err {
        BollardError::DockerResponseServerError {
            status_code: 404, ..
        } => ClientError::not_found("image", name),
        BollardError::DockerResponseServerError {
            status_code: 403,
            message,
        } => ClientError::Forbidden(message),
        other => ClientError::Unavailable {
            service: "docker".to_string(),
            message: other.to_string(),
        },
    }
}

impl DockerClient for BollardDockerClient {
    fn list_images(&self) -> Result<Vec<LocalImage>, ClientError> {
        let options = ListImagesOptions::<String> {
            all: false,
            ..Default::default()
        };
        let summaries = self
            .runtime
            .block_on(self.docker.list_images(Some(options)))
            .map_err(|e| translate(e, "*"))?;

        debug!("Docker daemon reported {} images", summaries.len());
        Ok(summaries
            .into_iter()
            .map(|s| LocalImage {
                id: s.id,
                repo_tags: s.repo_tags,
            })
            .collect())
    }

    fn inspect_image(&self, name: &str) -> Result<ImageMetadata, ClientError> {
        let inspect = self
            .runtime
            .block_on(self.docker.inspect_image(name))
            .map_err(|e| translate(e, name))?;

        let mut config = ImageConfig::default();
        if let Some(c) = inspect.config {
            config.exposed_ports = c
                .exposed_ports
                .map(|ports| ports.into_keys().collect())
                .unwrap_or_default();
            config.env = c.env.unwrap_or_default();
            config.labels = c
                .labels
                .map(|labels| labels.into_iter().collect())
                .unwrap_or_default();
            config.volumes = c
                .volumes
                .map(|volumes| volumes.into_keys().collect())
                .unwrap_or_default();
            config.cmd = c.cmd.unwrap_or_default();
            config.entrypoint = c.entrypoint.unwrap_or_default();
        }

        Ok(ImageMetadata {
            id: inspect.id.unwrap_or_default(),
            config,
        })
    }
}
