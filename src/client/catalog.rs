use super::{ClientError, ImageStreamClient, RegistryClient, RegistryConnection, TemplateClient};
use crate::api::{ImageMetadata, ImageStream, Template, DEFAULT_IMAGE_TAG};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// An image published in a registry snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryImage {
    #[serde(default)]
    pub registry: String,
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub image: ImageMetadata,
}

/// Offline snapshot of cluster and registry state.
///
/// Loaded from YAML, it answers image stream, template and registry lookups
/// without network access:
///
/// ```yaml
/// imageStreams:
///   - metadata: {name: ruby, namespace: openshift}
///     spec:
///       tags:
///         - name: "2.5"
///           annotations: {supports: "ruby:2.5,ruby", tags: "builder,ruby"}
///     status:
///       tags:
///         - tag: "2.5"
///           items: [{image: "sha256:aaa"}]
/// images:
///   "sha256:aaa": {id: "sha256:aaa", config: {exposedPorts: ["8080/tcp"]}}
/// templates: []
/// registry:
///   - {name: mysql, tag: latest}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub image_streams: Vec<ImageStream>,
    #[serde(default)]
    pub templates: Vec<Template>,
    /// Image metadata keyed by image id
    #[serde(default)]
    pub images: BTreeMap<String, ImageMetadata>,
    #[serde(default)]
    pub registry: Vec<RegistryImage>,
}

impl Catalog {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse catalog")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {:?}", path))?;
        let catalog = Self::from_yaml(&content)?;
        debug!(
            "Loaded catalog {:?}: {} image streams, {} templates, {} registry images",
            path,
            catalog.image_streams.len(),
            catalog.templates.len(),
            catalog.registry.len()
        );
        Ok(catalog)
    }

    pub fn with_image_stream(mut self, stream: ImageStream) -> Self {
        self.image_streams.push(stream);
        self
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.templates.push(template);
        self
    }

    pub fn with_image(mut self, image: ImageMetadata) -> Self {
        self.images.insert(image.id.clone(), image);
        self
    }

    pub fn with_registry_image(mut self, image: RegistryImage) -> Self {
        self.registry.push(image);
        self
    }
}

impl ImageStreamClient for Catalog {
    fn list_image_streams(&self, namespace: &str) -> Result<Vec<ImageStream>, ClientError> {
        Ok(self
            .image_streams
            .iter()
            .filter(|s| s.namespace() == namespace)
            .cloned()
            .collect())
    }

    fn get_image_stream(&self, namespace: &str, name: &str) -> Result<ImageStream, ClientError> {
        self.image_streams
            .iter()
            .find(|s| s.namespace() == namespace && s.name() == name)
            .cloned()
            .ok_or_else(|| ClientError::not_found("imagestream", format!("{}/{}", namespace, name)))
    }

    fn get_image_stream_image(
        &self,
        namespace: &str,
        stream: &str,
        image_id: &str,
    ) -> Result<ImageMetadata, ClientError> {
        self.get_image_stream(namespace, stream)?;
        self.images.get(image_id).cloned().ok_or_else(|| {
            ClientError::not_found("imagestreamimage", format!("{}@{}", stream, image_id))
        })
    }
}

impl TemplateClient for Catalog {
    fn list_templates(&self, namespace: &str) -> Result<Vec<Template>, ClientError> {
        Ok(self
            .templates
            .iter()
            .filter(|t| t.namespace() == namespace)
            .cloned()
            .collect())
    }
}

struct CatalogRegistry<'a> {
    images: Vec<&'a RegistryImage>,
}

impl RegistryClient for Catalog {
    fn connect(
        &self,
        registry: &str,
        _allow_insecure: bool,
    ) -> Result<Box<dyn RegistryConnection + '_>, ClientError> {
        let images: Vec<&RegistryImage> = self
            .registry
            .iter()
            .filter(|i| i.registry == registry)
            .collect();
        if images.is_empty() && !registry.is_empty() {
            return Err(ClientError::RegistryNotFound(registry.to_string()));
        }
        Ok(Box::new(CatalogRegistry { images }))
    }
}

impl RegistryConnection for CatalogRegistry<'_> {
    fn image_by_tag(
        &self,
        namespace: &str,
        name: &str,
        tag: &str,
    ) -> Result<ImageMetadata, ClientError> {
        let tag = if tag.is_empty() { DEFAULT_IMAGE_TAG } else { tag };
        self.images
            .iter()
            .find(|i| {
                let image_tag = if i.tag.is_empty() {
                    DEFAULT_IMAGE_TAG
                } else {
                    i.tag.as_str()
                };
                i.namespace == namespace && i.name == name && image_tag == tag
            })
            .map(|i| i.image.clone())
            .ok_or_else(|| ClientError::not_found("image", format!("{}:{}", name, tag)))
    }
}
