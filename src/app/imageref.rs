use super::env::Environment;
use super::matches::ComponentMatch;
use super::pipeline::PipelineError;
use crate::api::{
    join_image_stream_tag, BuildOutput, BuildTriggerPolicy, Container, ContainerPort,
    DeploymentTriggerPolicy, DockerImageReference, ImageMetadata, ImageStream, ImageStreamTag,
    ObjectMeta, ObjectReference, TagImportPolicy, TagReference, VolumeMount, DEFAULT_IMAGE_TAG,
    IMPORTED_FROM_ANNOTATION, INSECURE_REPOSITORY_ANNOTATION,
};
use std::collections::BTreeMap;

/// An image used by a pipeline, either as a build input, a build output or
/// a deployed container.
#[derive(Debug, Clone, Default)]
pub struct ImageRef {
    pub reference: DockerImageReference,
    /// Pull by image id rather than tag
    pub as_resolved_image: bool,
    /// Track the image through an image stream
    pub as_image_stream: bool,
    /// The image is produced by a build
    pub output_image: bool,
    pub insecure: bool,
    /// Tag the image into the stream instead of tracking the repository
    pub tag_directly: bool,
    /// Overrides the reference's tag inside the image stream
    pub tag: String,
    pub env: Environment,
    pub object_name: String,
    /// An image stream that already exists
    pub stream: Option<ImageStream>,
    pub info: Option<ImageMetadata>,
}

impl ImageRef {
    pub fn from_reference(reference: DockerImageReference) -> Self {
        Self {
            reference,
            ..Default::default()
        }
    }

    pub fn from_name(name: &str) -> Result<Self, PipelineError> {
        let reference = DockerImageReference::parse(name)
            .map_err(|err| PipelineError::InvalidImage(name.to_string(), err.to_string()))?;
        Ok(Self::from_reference(reference))
    }

    /// An image tracked by an existing stream
    pub fn from_stream(stream: &ImageStream, tag: &str) -> Self {
        let repository = if stream.status.docker_image_repository.is_empty() {
            &stream.spec.docker_image_repository
        } else {
            &stream.status.docker_image_repository
        };
        let mut reference = DockerImageReference::parse(repository).unwrap_or_else(|_| {
            DockerImageReference {
                namespace: stream.namespace().to_string(),
                name: stream.name().to_string(),
                ..Default::default()
            }
        });
        reference.tag = tag.to_string();
        Self {
            reference,
            stream: Some(stream.clone()),
            ..Default::default()
        }
    }

    /// The input image a resolved match stands for
    pub fn from_match(m: &ComponentMatch) -> Result<Self, PipelineError> {
        if let Some(stream) = m.image_stream() {
            let mut image = Self::from_stream(stream, &m.image_tag);
            image.as_image_stream = true;
            image.tag_directly = m.supports_direct_tagging;
            image.info = m.image().cloned();
            return Ok(image);
        }
        let mut image = Self::from_name(&m.value)?;
        if m.is_image() {
            if m.supports_direct_tagging {
                image.tag_directly = true;
                image.as_resolved_image = true;
            }
            image.as_image_stream = !m.local_only;
            image.info = m.image().cloned();
            image.insecure = m.insecure;
        }
        Ok(image)
    }

    /// Object name for the stream or container, in order of preference
    pub fn suggest_name(&self) -> Option<String> {
        if !self.object_name.is_empty() {
            return Some(self.object_name.clone());
        }
        if let Some(stream) = &self.stream {
            return Some(stream.name().to_string());
        }
        if !self.reference.name.is_empty() {
            let name = self.reference.name.rsplit('/').next().unwrap_or_default();
            return Some(name.to_string());
        }
        None
    }

    /// The tag the image carries inside an image stream
    pub fn internal_tag(&self) -> &str {
        if !self.tag.is_empty() {
            &self.tag
        } else if !self.reference.tag.is_empty() {
            &self.reference.tag
        } else {
            DEFAULT_IMAGE_TAG
        }
    }

    pub fn pull_spec(&self) -> String {
        match &self.info {
            Some(info) if self.as_resolved_image && !info.id.is_empty() => DockerImageReference {
                tag: String::new(),
                id: info.id.clone(),
                ..self.reference.clone()
            }
            .exact(),
            _ => self.reference.exact(),
        }
    }

    fn name(&self) -> Result<String, PipelineError> {
        self.suggest_name()
            .ok_or_else(|| PipelineError::MissingImageStream(self.reference.exact()))
    }

    pub fn object_reference(&self) -> Result<ObjectReference, PipelineError> {
        if let Some(stream) = &self.stream {
            return Ok(ObjectReference::image_stream_tag(
                join_image_stream_tag(stream.name(), self.internal_tag()),
                stream.namespace(),
            ));
        }
        if self.as_image_stream {
            return Ok(ObjectReference::image_stream_tag(
                join_image_stream_tag(&self.name()?, self.internal_tag()),
                "",
            ));
        }
        Ok(ObjectReference::docker_image(self.pull_spec()))
    }

    fn import_tag(&self) -> TagReference {
        TagReference {
            name: self.internal_tag().to_string(),
            annotations: BTreeMap::from([(
                IMPORTED_FROM_ANNOTATION.to_string(),
                self.reference.exact(),
            )]),
            from: Some(ObjectReference::docker_image(self.reference.exact())),
            import_policy: TagImportPolicy {
                insecure: self.insecure,
            },
        }
    }

    /// The image stream that tracks or receives this image
    pub fn image_stream(&self) -> Result<ImageStream, PipelineError> {
        if let Some(stream) = &self.stream {
            return Ok(stream.clone());
        }
        let mut stream = ImageStream::new(ObjectMeta::named(self.name()?));
        if self.output_image {
            return Ok(stream);
        }
        if !self.tag_directly {
            stream.spec.docker_image_repository = self.reference.as_repository().exact();
            if self.insecure {
                stream
                    .metadata
                    .annotations
                    .insert(INSECURE_REPOSITORY_ANNOTATION.to_string(), "true".to_string());
            }
            return Ok(stream);
        }
        stream.spec.tags.push(self.import_tag());
        Ok(stream)
    }

    /// A tag importing this image into an already existing stream
    pub fn image_stream_tag(&self) -> Result<ImageStreamTag, PipelineError> {
        let mut meta = ObjectMeta::named(join_image_stream_tag(&self.name()?, self.internal_tag()));
        meta.annotations.insert(
            IMPORTED_FROM_ANNOTATION.to_string(),
            self.reference.exact(),
        );
        Ok(ImageStreamTag::new(meta, self.import_tag()))
    }

    pub fn build_output(&self) -> Result<BuildOutput, PipelineError> {
        if !self.as_image_stream {
            return Ok(BuildOutput {
                to: Some(ObjectReference::docker_image(self.reference.exact())),
            });
        }
        let stream = self.image_stream()?;
        Ok(BuildOutput {
            to: Some(ObjectReference::image_stream_tag(
                join_image_stream_tag(stream.name(), self.internal_tag()),
                "",
            )),
        })
    }

    /// Triggers that rebuild when this image changes
    pub fn build_triggers(&self) -> Vec<BuildTriggerPolicy> {
        if self.stream.is_none() && !self.as_image_stream {
            return Vec::new();
        }
        vec![BuildTriggerPolicy::image_change()]
    }

    /// A container running this image, with the deployment triggers that
    /// follow it
    pub fn deployable_container(
        &self,
    ) -> Result<(Container, Vec<DeploymentTriggerPolicy>), PipelineError> {
        let name = self.name()?;
        let mut triggers = Vec::new();
        if self.as_image_stream {
            triggers.push(DeploymentTriggerPolicy::image_change(
                &name,
                self.object_reference()?,
            ));
        }

        let mut container = Container {
            name: name.clone(),
            image: self.pull_spec(),
            env: self.env.list(),
            ..Default::default()
        };
        if let Some(info) = &self.info {
            for exposed in &info.config.exposed_ports {
                let (port, protocol) = exposed.split_once('/').unwrap_or((exposed.as_str(), "tcp"));
                let port: i32 = port
                    .parse()
                    .map_err(|_| PipelineError::InvalidPort(exposed.clone()))?;
                container.ports.push(ContainerPort {
                    container_port: port,
                    protocol: protocol.to_uppercase(),
                });
            }
            container.ports.sort_by_key(|p| p.container_port);
            for (i, volume) in info.config.volumes.iter().enumerate() {
                container.volume_mounts.push(VolumeMount {
                    name: format!("{}-volume-{}", name, i + 1),
                    mount_path: volume.clone(),
                });
            }
        }
        Ok((container, triggers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::matches::MatchPayload;

    fn image_with_ports(ports: &[&str], volumes: &[&str]) -> ImageMetadata {
        let mut image = ImageMetadata {
            id: "sha256:abc".to_string(),
            ..Default::default()
        };
        image.config.exposed_ports = ports.iter().map(|p| p.to_string()).collect();
        image.config.volumes = volumes.iter().map(|v| v.to_string()).collect();
        image
    }

    #[test]
    fn test_from_local_docker_match() {
        let m = ComponentMatch {
            value: "mysql:5.7".to_string(),
            local_only: true,
            payload: Some(MatchPayload::Image(Box::new(image_with_ports(&["3306/tcp"], &[])))),
            ..Default::default()
        };
        let image = ImageRef::from_match(&m).unwrap();
        assert!(!image.as_image_stream);
        assert_eq!(image.suggest_name().as_deref(), Some("mysql"));
        assert_eq!(
            image.object_reference().unwrap(),
            ObjectReference::docker_image("mysql:5.7")
        );
    }

    #[test]
    fn test_image_stream_tracks_repository_or_tags_directly() {
        let mut image = ImageRef::from_name("quay.io/app/api:v1").unwrap();
        image.as_image_stream = true;
        image.insecure = true;

        let stream = image.image_stream().unwrap();
        assert_eq!(stream.name(), "api");
        assert_eq!(stream.spec.docker_image_repository, "quay.io/app/api");
        assert_eq!(
            stream.metadata.annotations.get(INSECURE_REPOSITORY_ANNOTATION).map(String::as_str),
            Some("true")
        );

        image.tag_directly = true;
        let stream = image.image_stream().unwrap();
        assert!(stream.spec.docker_image_repository.is_empty());
        let tag = &stream.spec.tags[0];
        assert_eq!(tag.name, "v1");
        assert_eq!(
            tag.annotations.get(IMPORTED_FROM_ANNOTATION).map(String::as_str),
            Some("quay.io/app/api:v1")
        );
        assert!(tag.import_policy.insecure);

        let ist = image.image_stream_tag().unwrap();
        assert_eq!(ist.metadata.name, "api:v1");
    }

    #[test]
    fn test_existing_stream_reference_uses_its_namespace() {
        let mut meta = ObjectMeta::named("ruby");
        meta.namespace = "openshift".to_string();
        let stream = ImageStream::new(meta);
        let image = ImageRef::from_stream(&stream, "2.5");

        assert_eq!(
            image.object_reference().unwrap(),
            ObjectReference::image_stream_tag("ruby:2.5", "openshift")
        );
        assert_eq!(image.build_triggers().len(), 1);
    }

    #[test]
    fn test_deployable_container() {
        let mut image = ImageRef::from_name("mysql").unwrap();
        image.as_image_stream = true;
        image.info = Some(image_with_ports(&["8080/tcp", "53/udp"], &["/var/lib/mysql"]));
        image.env.insert("MYSQL_USER", "app");

        let (container, triggers) = image.deployable_container().unwrap();
        assert_eq!(container.name, "mysql");
        assert_eq!(
            container.ports,
            vec![
                ContainerPort { container_port: 53, protocol: "UDP".to_string() },
                ContainerPort { container_port: 8080, protocol: "TCP".to_string() },
            ]
        );
        assert_eq!(container.volume_mounts[0].name, "mysql-volume-1");
        assert_eq!(container.env[0].name, "MYSQL_USER");
        assert_eq!(triggers.len(), 1);
        assert_eq!(
            triggers[0].image_change_params.as_ref().unwrap().from,
            ObjectReference::image_stream_tag("mysql:latest", "")
        );
    }

    #[test]
    fn test_resolved_image_pulls_by_id() {
        let mut image = ImageRef::from_name("mysql:5.7").unwrap();
        image.as_resolved_image = true;
        image.info = Some(image_with_ports(&[], &[]));
        assert_eq!(image.pull_spec(), "mysql@sha256:abc");
    }
}
