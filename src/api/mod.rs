//! Orchestrator object model
//!
//! These are the object descriptions the engine reads from the cluster
//! (image streams, templates, image metadata) and the ones it emits
//! (build configs, deployment configs, services). Field names serialize in
//! the platform's camelCase convention so the generated list can be handed
//! straight to an encoder.

mod build;
mod deploy;
mod image;
mod meta;
mod object;
mod template;

pub use build::{
    BuildConfig, BuildConfigSpec, BuildOutput, BuildSource, BuildStrategy, BuildTriggerPolicy,
    DockerBuildStrategy, GitBuildSource, ImageChangeTrigger, SourceBuildStrategy, WebHookTrigger,
};
pub use deploy::{
    Container, ContainerPort, DeploymentConfig, DeploymentConfigSpec, DeploymentTriggerImageChangeParams,
    DeploymentTriggerPolicy, EmptyDirVolumeSource, PodSpec, PodTemplateSpec, Service, ServicePort,
    ServiceSpec, Volume, VolumeMount,
};
pub use image::{
    join_image_stream_tag, DockerImageReference, ImageConfig, ImageMetadata, ImageStream,
    ImageStreamSpec, ImageStreamStatus, ImageStreamTag, NamedTagEventList, ReferenceError,
    TagEvent, TagImportPolicy, TagReference, DEFAULT_IMAGE_TAG, IMPORTED_FROM_ANNOTATION,
    INSECURE_REPOSITORY_ANNOTATION,
};
pub use meta::{EnvVar, ObjectMeta, ObjectReference};
pub use object::{Object, ObjectList};
pub use template::{Template, TemplateParameter};
