use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata shared by every object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Set by the server; a non-zero value means the server tracks spec
    /// generations (and therefore supports tagging images directly).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub generation: i64,

    /// Present only on objects that were read back from the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl ObjectMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Reference to another object by kind and name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

impl ObjectReference {
    pub fn image_stream_tag(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind: "ImageStreamTag".to_string(),
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    pub fn docker_image(pull_spec: impl Into<String>) -> Self {
        Self {
            kind: "DockerImage".to_string(),
            name: pull_spec.into(),
            namespace: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}
