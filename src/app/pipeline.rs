//! Pipeline assembly
//!
//! A pipeline is the set of objects derived from one resolved component:
//! an optional build with its input and output images, the image itself and
//! an optional deployment. Pipelines of one group share a deployment after
//! [`PipelineGroup::reduce`].

use super::acceptor::{AcceptFirst, Acceptor};
use super::env::Environment;
use super::imageref::ImageRef;
use super::naming::{InvalidNameError, UniqueNameGenerator};
use super::source::{SourceRepository, Strategy};
use crate::api::{
    BuildConfig, BuildConfigSpec, BuildSource, BuildStrategy, BuildTriggerPolicy,
    DeploymentConfig, DeploymentConfigSpec, DeploymentTriggerPolicy, DockerBuildStrategy,
    DockerImageReference, EmptyDirVolumeSource, GitBuildSource, Object, ObjectMeta, PodSpec,
    PodTemplateSpec, Service, ServicePort, ServiceSpec, SourceBuildStrategy, Volume,
    DEFAULT_IMAGE_TAG,
};
use crate::client::Git;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("a name is required and could not be suggested from the inputs; use --name")]
    NameRequired,

    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),

    #[error("invalid image reference {0:?}: {1}")]
    InvalidImage(String, String),

    #[error("unable to suggest an image stream name for {0:?}")]
    MissingImageStream(String),

    #[error("the build of {0:?} uses the source strategy but has no builder image")]
    SourceStrategyWithoutImage(String),

    #[error("failed to parse exposed port {0:?}")]
    InvalidPort(String),

    #[error(transparent)]
    Source(#[from] super::errors::SourceError),
}

/// Where a build gets its source
#[derive(Debug, Clone, Default)]
pub struct SourceRef {
    pub url: Option<Url>,
    pub git_ref: String,
    pub context_dir: String,
    pub name: String,
    pub binary: bool,
}

impl SourceRef {
    /// The last path segment of the URL without `.git`
    pub fn suggest_name(&self) -> Option<String> {
        if !self.name.is_empty() {
            return Some(self.name.clone());
        }
        let url = self.url.as_ref()?;
        let segment = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())?;
        let name = segment.strip_suffix(".git").unwrap_or(segment);
        (!name.is_empty()).then(|| name.to_string())
    }

    fn build_source(&self) -> (BuildSource, Vec<BuildTriggerPolicy>) {
        let mut source = BuildSource {
            binary: self.binary,
            ..Default::default()
        };
        let mut triggers = Vec::new();
        if let Some(url) = &self.url {
            let mut uri = url.clone();
            uri.set_fragment(None);
            source.source_type = "Git".to_string();
            source.git = Some(GitBuildSource {
                uri: uri.to_string(),
                git_ref: self.git_ref.clone(),
            });
            source.context_dir = self.context_dir.clone();
            triggers.push(BuildTriggerPolicy::github(generate_secret()));
            triggers.push(BuildTriggerPolicy::generic(generate_secret()));
        } else if self.binary {
            source.source_type = "Binary".to_string();
        }
        (source, triggers)
    }
}

fn generate_secret() -> String {
    Uuid::new_v4().simple().to_string()
}

/// How a build turns source into an image
#[derive(Debug, Clone, Default)]
pub struct BuildStrategyRef {
    pub strategy: Strategy,
    pub base: Option<Rc<ImageRef>>,
    /// Ports the Dockerfile exposes, for docker builds
    pub exposed_ports: Vec<String>,
}

impl BuildStrategyRef {
    pub fn is_docker_build(&self) -> bool {
        self.strategy == Strategy::Docker
    }

    fn build_strategy(
        &self,
        env: &Environment,
        from: &str,
    ) -> Result<(BuildStrategy, Vec<BuildTriggerPolicy>), PipelineError> {
        if self.is_docker_build() {
            let (from, triggers) = match &self.base {
                Some(base) => (Some(base.object_reference()?), base.build_triggers()),
                None => (None, Vec::new()),
            };
            return Ok((
                BuildStrategy {
                    strategy_type: "Docker".to_string(),
                    docker_strategy: Some(DockerBuildStrategy {
                        from,
                        env: env.list(),
                    }),
                    ..Default::default()
                },
                triggers,
            ));
        }
        let base = self
            .base
            .as_ref()
            .ok_or_else(|| PipelineError::SourceStrategyWithoutImage(from.to_string()))?;
        Ok((
            BuildStrategy {
                strategy_type: "Source".to_string(),
                source_strategy: Some(SourceBuildStrategy {
                    from: base.object_reference()?,
                    env: env.list(),
                }),
                ..Default::default()
            },
            base.build_triggers(),
        ))
    }
}

/// Prepares the strategy and source of a build from a repository
pub fn strategy_and_source_for_repository(
    repo: &mut SourceRepository,
    git: &dyn Git,
) -> Result<(BuildStrategyRef, SourceRef), PipelineError> {
    let mut strategy = BuildStrategyRef {
        strategy: repo.strategy(),
        ..Default::default()
    };
    if repo.is_docker_build() {
        if let Some(dockerfile) = repo.info().and_then(|i| i.dockerfile.as_ref()) {
            strategy.exposed_ports = dockerfile.exposed_ports.clone();
        }
    }
    let url = repo.remote_url(git)?;
    let source = SourceRef {
        git_ref: url.fragment().unwrap_or_default().to_string(),
        url: Some(url),
        context_dir: repo.context_dir().to_string(),
        ..Default::default()
    };
    Ok((strategy, source))
}

/// A build producing an output image
#[derive(Debug)]
pub struct BuildRef {
    pub from: String,
    pub source: Option<SourceRef>,
    pub input: Option<Rc<ImageRef>>,
    pub strategy: Option<BuildStrategyRef>,
    pub output: Rc<ImageRef>,
    pub env: Environment,
}

impl BuildRef {
    pub fn build_config(&self) -> Result<BuildConfig, PipelineError> {
        let name = self
            .source
            .as_ref()
            .and_then(SourceRef::suggest_name)
            .or_else(|| self.output.suggest_name())
            .ok_or(PipelineError::NameRequired)?;

        let (source, mut triggers) = match &self.source {
            Some(source) => source.build_source(),
            None => (BuildSource::default(), Vec::new()),
        };
        let (strategy, strategy_triggers) = match &self.strategy {
            Some(strategy) => strategy.build_strategy(&self.env, &self.from)?,
            None => (BuildStrategy::default(), Vec::new()),
        };
        triggers.push(BuildTriggerPolicy::config_change());
        triggers.extend(strategy_triggers);

        Ok(BuildConfig::new(
            ObjectMeta::named(name),
            BuildConfigSpec {
                triggers,
                source,
                strategy,
                output: self.output.build_output()?,
            },
        ))
    }
}

/// A deployment running one container per image
#[derive(Debug, Default)]
pub struct DeploymentConfigRef {
    pub name: String,
    pub images: Vec<Rc<ImageRef>>,
    pub env: Environment,
    pub labels: BTreeMap<String, String>,
}

impl DeploymentConfigRef {
    pub fn deployment_config(&self) -> Result<DeploymentConfig, PipelineError> {
        let name = if self.name.is_empty() {
            self.images
                .iter()
                .find_map(|i| i.suggest_name())
                .ok_or(PipelineError::NameRequired)?
        } else {
            self.name.clone()
        };

        let mut selector = BTreeMap::from([("deploymentconfig".to_string(), name.clone())]);
        selector.extend(self.labels.clone());

        let mut triggers = vec![DeploymentTriggerPolicy::config_change()];
        let mut pod = PodSpec::default();
        for image in &self.images {
            let (container, container_triggers) = image.deployable_container()?;
            triggers.extend(container_triggers);
            pod.containers.push(container);
        }
        for container in &pod.containers {
            for mount in &container.volume_mounts {
                pod.volumes.push(Volume {
                    name: mount.name.clone(),
                    empty_dir: EmptyDirVolumeSource {},
                });
            }
        }
        let env = self.env.list();
        for container in &mut pod.containers {
            container.env.extend(env.iter().cloned());
        }

        let meta = ObjectMeta {
            labels: self.labels.clone(),
            ..ObjectMeta::named(name)
        };
        let template_meta = ObjectMeta {
            labels: selector.clone(),
            ..Default::default()
        };
        Ok(DeploymentConfig::new(
            meta,
            DeploymentConfigSpec {
                replicas: 1,
                selector,
                triggers,
                template: PodTemplateSpec {
                    metadata: template_meta,
                    spec: pod,
                },
            },
        ))
    }
}

/// The objects derived from one component
#[derive(Debug)]
pub struct Pipeline {
    pub name: String,
    pub from: String,
    pub input_image: Option<Rc<ImageRef>>,
    pub build: Option<Rc<BuildRef>>,
    pub image: Option<Rc<ImageRef>>,
    pub deployment: Option<Rc<RefCell<DeploymentConfigRef>>>,
}

impl Pipeline {
    /// Adds a deployment of the pipeline's image unless it has one
    pub fn needs_deployment(&mut self, env: &Environment, labels: &BTreeMap<String, String>) {
        if self.deployment.is_some() {
            return;
        }
        self.deployment = Some(Rc::new(RefCell::new(DeploymentConfigRef {
            name: self.name.clone(),
            images: self.image.iter().cloned().collect(),
            env: env.clone(),
            labels: labels.clone(),
        })));
    }

    fn image_objects(
        image: &Rc<ImageRef>,
        accept: &AcceptFirst,
        object_accept: &dyn Acceptor,
        objects: &mut Vec<Object>,
    ) -> Result<(), PipelineError> {
        if !image.as_image_stream || !accept.accept_part(image) {
            return Ok(());
        }
        let stream = Object::ImageStream(image.image_stream()?);
        if object_accept.accept(&stream) {
            objects.push(stream);
        } else if !image.output_image {
            let tag = Object::ImageStreamTag(image.image_stream_tag()?);
            if object_accept.accept(&tag) {
                objects.push(tag);
            }
        }
        Ok(())
    }

    /// Emits the pipeline's objects in a fixed order: input image stream,
    /// output image stream, build config, deployment config.
    pub fn objects(
        &self,
        accept: &AcceptFirst,
        object_accept: &dyn Acceptor,
    ) -> Result<Vec<Object>, PipelineError> {
        let mut objects = Vec::new();
        if let Some(input) = &self.input_image {
            if input.stream.is_none() {
                Self::image_objects(input, accept, object_accept, &mut objects)?;
            }
        }
        if let Some(image) = &self.image {
            Self::image_objects(image, accept, object_accept, &mut objects)?;
        }
        if let Some(build) = &self.build {
            if accept.accept_part(build) {
                let config = Object::BuildConfig(build.build_config()?);
                if object_accept.accept(&config) {
                    objects.push(config);
                }
            }
        }
        if let Some(deployment) = &self.deployment {
            if accept.accept_part(deployment) {
                let config = Object::DeploymentConfig(deployment.borrow().deployment_config()?);
                if object_accept.accept(&config) {
                    objects.push(config);
                }
            }
        }
        Ok(objects)
    }
}

/// Pipelines deployed together
#[derive(Debug, Default)]
pub struct PipelineGroup(pub Vec<Pipeline>);

impl PipelineGroup {
    /// Folds the deployments of the group into the first one.
    ///
    /// Images of later deployments are appended to it and their environment
    /// overrides its values; every pipeline then points at it.
    pub fn reduce(&mut self) {
        let mut canonical: Option<Rc<RefCell<DeploymentConfigRef>>> = None;
        for pipeline in &mut self.0 {
            let Some(deployment) = &pipeline.deployment else {
                continue;
            };
            match &canonical {
                None => canonical = Some(Rc::clone(deployment)),
                Some(target) if Rc::ptr_eq(target, deployment) => {}
                Some(target) => {
                    {
                        let other = deployment.borrow();
                        let mut target = target.borrow_mut();
                        target.images.extend(other.images.iter().cloned());
                        target.env = target.env.merged(&other.env);
                    }
                    debug!(pipeline = %pipeline.name, "merged deployment into group");
                    pipeline.deployment = Some(Rc::clone(target));
                }
            }
        }
    }

    pub fn pipelines(&self) -> &[Pipeline] {
        &self.0
    }
}

/// Creates pipelines with unique names
pub struct PipelineBuilder {
    names: UniqueNameGenerator,
    name: String,
    to: String,
    env: Environment,
    output_docker: bool,
}

impl PipelineBuilder {
    /// `name` overrides every suggested name; `env` is the build environment
    pub fn new(name: &str, env: Environment, output_docker: bool) -> Self {
        Self {
            names: UniqueNameGenerator::new(),
            name: name.to_string(),
            to: String::new(),
            env,
            output_docker,
        }
    }

    /// Sets the output image of builds
    pub fn to(mut self, to: &str) -> Self {
        self.to = to.to_string();
        self
    }

    fn generate(&mut self, suggestions: &[Option<String>]) -> Result<String, PipelineError> {
        if !self.name.is_empty() {
            return Ok(self.names.generate(&self.name)?);
        }
        let suggested = suggestions
            .iter()
            .flatten()
            .next()
            .ok_or(PipelineError::NameRequired)?;
        Ok(self.names.generate(suggested)?)
    }

    pub fn new_build_pipeline(
        &mut self,
        from: &str,
        input: Option<ImageRef>,
        strategy: Option<BuildStrategyRef>,
        source: Option<SourceRef>,
    ) -> Result<Pipeline, PipelineError> {
        let mut output = ImageRef {
            output_image: true,
            as_image_stream: !self.output_docker,
            ..Default::default()
        };
        let source_name = source.as_ref().and_then(SourceRef::suggest_name);
        let input_name = input.as_ref().and_then(ImageRef::suggest_name);
        let name = if self.to.is_empty() {
            let name = self.generate(&[source_name, input_name])?;
            output.reference = DockerImageReference {
                name: name.clone(),
                tag: DEFAULT_IMAGE_TAG.to_string(),
                ..Default::default()
            };
            name
        } else {
            output.reference = DockerImageReference::parse(&self.to)
                .map_err(|err| PipelineError::InvalidImage(self.to.clone(), err.to_string()))?;
            let output_name = output.suggest_name();
            self.generate(&[source_name, output_name, input_name])?
        };

        let mut input = input;
        let mut strategy = strategy;
        if let (Some(strategy), Some(input)) = (&strategy, &mut input) {
            if strategy.is_docker_build() && !strategy.exposed_ports.is_empty() {
                let info = input.info.get_or_insert_with(Default::default);
                info.config.exposed_ports = strategy.exposed_ports.iter().cloned().collect();
            }
        }
        output.info = input.as_ref().and_then(|i| i.info.clone());

        let input = input.map(Rc::new);
        if let Some(strategy) = &mut strategy {
            strategy.base = input.clone();
        }
        let source = source.map(|mut s| {
            s.name = name.clone();
            s
        });
        let output = Rc::new(output);
        info!(name = %name, from, "build pipeline");
        let build = BuildRef {
            from: from.to_string(),
            source,
            input: input.clone(),
            strategy,
            output: Rc::clone(&output),
            env: self.env.clone(),
        };
        Ok(Pipeline {
            name,
            from: from.to_string(),
            input_image: input,
            build: Some(Rc::new(build)),
            image: Some(output),
            deployment: None,
        })
    }

    pub fn new_image_pipeline(&mut self, from: &str, mut input: ImageRef) -> Result<Pipeline, PipelineError> {
        let name = self.generate(&[input.suggest_name()])?;
        input.object_name = name.clone();
        info!(name = %name, from, "image pipeline");
        Ok(Pipeline {
            name,
            from: from.to_string(),
            input_image: None,
            build: None,
            image: Some(Rc::new(input)),
            deployment: None,
        })
    }
}

/// Collects the objects of every pipeline, each part and object once
pub fn pipeline_objects(
    group: &PipelineGroup,
    object_accept: &dyn Acceptor,
) -> Result<Vec<Object>, PipelineError> {
    let accept = AcceptFirst::new();
    let mut objects = Vec::new();
    for pipeline in group.pipelines() {
        objects.extend(pipeline.objects(&accept, object_accept)?);
    }
    Ok(objects)
}

/// Adds a service for every deployment config that exposes ports.
///
/// Ports are ordered by number and deduplicated by port and protocol. With
/// `first_port_only` each container contributes only its first port.
pub fn add_services(objects: &mut Vec<Object>, first_port_only: bool) {
    let mut services = Vec::new();
    for object in objects.iter() {
        let Object::DeploymentConfig(dc) = object else {
            continue;
        };
        let mut ports = Vec::new();
        for container in &dc.spec.template.spec.containers {
            let container_ports = container.ports.iter();
            if first_port_only {
                ports.extend(container_ports.take(1));
            } else {
                ports.extend(container_ports);
            }
        }
        ports.sort_by_key(|p| p.container_port);

        let mut seen = HashSet::new();
        let service_ports: Vec<ServicePort> = ports
            .into_iter()
            .filter_map(|p| {
                let name = format!("{}-{}", p.container_port, p.protocol).to_lowercase();
                seen.insert(name.clone()).then(|| ServicePort {
                    name,
                    port: p.container_port,
                    protocol: p.protocol.clone(),
                    target_port: p.container_port,
                })
            })
            .collect();
        if service_ports.is_empty() {
            info!(deployment = %dc.metadata.name, "no ports exposed, not creating a service");
            continue;
        }

        let meta = ObjectMeta {
            labels: dc.metadata.labels.clone(),
            ..ObjectMeta::named(dc.metadata.name.clone())
        };
        services.push(Object::Service(Service::new(
            meta,
            ServiceSpec {
                selector: dc.spec.selector.clone(),
                ports: service_ports,
            },
        )));
    }
    objects.extend(services);
}
