use super::build::BuildConfig;
use super::deploy::{DeploymentConfig, Service};
use super::image::{ImageStream, ImageStreamTag};
use super::template::Template;
use serde::Serialize;

/// One emitted object description
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Object {
    ImageStream(ImageStream),
    ImageStreamTag(ImageStreamTag),
    BuildConfig(BuildConfig),
    DeploymentConfig(DeploymentConfig),
    Service(Service),
    Template(Template),
    /// An object produced by template processing, kept as-is
    Raw(serde_json::Value),
}

impl Object {
    pub fn kind(&self) -> &str {
        match self {
            Object::ImageStream(o) => &o.kind,
            Object::ImageStreamTag(o) => &o.kind,
            Object::BuildConfig(o) => &o.kind,
            Object::DeploymentConfig(o) => &o.kind,
            Object::Service(o) => &o.kind,
            Object::Template(o) => &o.kind,
            Object::Raw(v) => v.get("kind").and_then(|k| k.as_str()).unwrap_or_default(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Object::Raw(v) => raw_metadata_field(v, "name"),
            _ => self.typed_metadata().map(|m| m.name.as_str()).unwrap_or_default(),
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            Object::Raw(v) => raw_metadata_field(v, "namespace"),
            _ => self
                .typed_metadata()
                .map(|m| m.namespace.as_str())
                .unwrap_or_default(),
        }
    }

    /// True when the object was read back from a server rather than generated
    pub fn exists_on_server(&self) -> bool {
        match self {
            Object::Raw(v) => !raw_metadata_field(v, "resourceVersion").is_empty(),
            _ => self
                .typed_metadata()
                .map(|m| m.resource_version.is_some())
                .unwrap_or(false),
        }
    }

    fn typed_metadata(&self) -> Option<&super::ObjectMeta> {
        match self {
            Object::ImageStream(o) => Some(&o.metadata),
            Object::ImageStreamTag(o) => Some(&o.metadata),
            Object::BuildConfig(o) => Some(&o.metadata),
            Object::DeploymentConfig(o) => Some(&o.metadata),
            Object::Service(o) => Some(&o.metadata),
            Object::Template(o) => Some(&o.metadata),
            Object::Raw(_) => None,
        }
    }
}

fn raw_metadata_field<'a>(value: &'a serde_json::Value, field: &str) -> &'a str {
    value
        .get("metadata")
        .and_then(|m| m.get(field))
        .and_then(|f| f.as_str())
        .unwrap_or_default()
}

/// The top-level list handed to an encoder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectList {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub items: Vec<Object>,
}

impl ObjectList {
    pub fn new(items: Vec<Object>) -> Self {
        Self {
            api_version: "v1",
            kind: "List",
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ObjectMeta;
    use serde_json::json;

    #[test]
    fn test_raw_object_identity() {
        let raw = Object::Raw(json!({
            "kind": "Route",
            "metadata": {"name": "frontend", "namespace": "demo", "resourceVersion": "12"}
        }));
        assert_eq!(raw.kind(), "Route");
        assert_eq!(raw.name(), "frontend");
        assert_eq!(raw.namespace(), "demo");
        assert!(raw.exists_on_server());
    }

    #[test]
    fn test_typed_object_serializes_kind() {
        let stream = Object::ImageStream(ImageStream::new(ObjectMeta::named("ruby")));
        let value = serde_json::to_value(&stream).unwrap();
        assert_eq!(value["kind"], "ImageStream");
        assert_eq!(value["metadata"]["name"], "ruby");
        assert!(!stream.exists_on_server());
    }
}
