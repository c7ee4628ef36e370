use super::meta::{ObjectMeta, ObjectReference};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Tag assumed when an image reference does not name one
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Annotation recording where a directly tagged image was imported from
pub const IMPORTED_FROM_ANNOTATION: &str = "openshift.io/imported-from";

/// Annotation marking an image stream repository as insecure
pub const INSECURE_REPOSITORY_ANNOTATION: &str = "openshift.io/image.insecureRepository";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("image reference is empty")]
    Empty,

    #[error("invalid image reference {reference:?}: {reason}")]
    Invalid { reference: String, reason: String },
}

/// A parsed `[registry/][namespace/]name[:tag][@id]` pull spec
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DockerImageReference {
    pub registry: String,
    pub namespace: String,
    pub name: String,
    pub tag: String,
    pub id: String,
}

fn path_component_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:[._-]+[a-z0-9]+)*$").expect("valid regex"))
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("valid regex"))
}

fn looks_like_registry(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':') || segment == "localhost"
}

impl DockerImageReference {
    pub fn parse(spec: &str) -> Result<Self, ReferenceError> {
        if spec.is_empty() {
            return Err(ReferenceError::Empty);
        }
        let invalid = |reason: &str| ReferenceError::Invalid {
            reference: spec.to_string(),
            reason: reason.to_string(),
        };

        let (path, id) = match spec.split_once('@') {
            Some((path, id)) if !id.is_empty() => (path, id),
            Some(_) => return Err(invalid("digest must not be empty")),
            None => (spec, ""),
        };

        let mut segments: Vec<&str> = path.split('/').collect();
        let last = segments.pop().unwrap_or_default();
        let (last, tag) = match last.rsplit_once(':') {
            Some((name, tag)) => {
                if !tag_regex().is_match(tag) {
                    return Err(invalid("tag is not valid"));
                }
                (name, tag)
            }
            None => (last, ""),
        };
        segments.push(last);

        let mut reference = DockerImageReference {
            tag: tag.to_string(),
            id: id.to_string(),
            ..Default::default()
        };
        match segments.as_slice() {
            [name] => reference.name = name.to_string(),
            [first, name] if looks_like_registry(first) => {
                reference.registry = first.to_string();
                reference.name = name.to_string();
            }
            [namespace, name] => {
                reference.namespace = namespace.to_string();
                reference.name = name.to_string();
            }
            [registry, namespace, rest @ ..] => {
                reference.registry = registry.to_string();
                reference.namespace = namespace.to_string();
                reference.name = rest.join("/");
            }
            [] => return Err(invalid("name is required")),
        }

        if reference.name.is_empty() {
            return Err(invalid("name is required"));
        }
        if !reference
            .name
            .split('/')
            .all(|part| path_component_regex().is_match(part))
        {
            return Err(invalid("name must be lowercase alphanumerics separated by '.', '_' or '-'"));
        }
        if !reference.namespace.is_empty() && !path_component_regex().is_match(&reference.namespace)
        {
            return Err(invalid("namespace must be lowercase alphanumerics separated by '.', '_' or '-'"));
        }
        if reference.registry.contains(char::is_whitespace) {
            return Err(invalid("registry must not contain whitespace"));
        }

        Ok(reference)
    }

    /// `name[:tag]`, or `name@id` when an id is set
    pub fn name_string(&self) -> String {
        if !self.id.is_empty() {
            format!("{}@{}", self.name, self.id)
        } else if !self.tag.is_empty() {
            format!("{}:{}", self.name, self.tag)
        } else {
            self.name.clone()
        }
    }

    /// The reference without tag or id
    pub fn as_repository(&self) -> Self {
        Self {
            tag: String::new(),
            id: String::new(),
            ..self.clone()
        }
    }

    /// The fully qualified pull spec including tag and id
    pub fn exact(&self) -> String {
        let mut out = String::new();
        if !self.registry.is_empty() {
            out.push_str(&self.registry);
            out.push('/');
        }
        if !self.namespace.is_empty() {
            out.push_str(&self.namespace);
            out.push('/');
        }
        out.push_str(&self.name);
        if !self.tag.is_empty() {
            out.push(':');
            out.push_str(&self.tag);
        }
        if !self.id.is_empty() {
            out.push('@');
            out.push_str(&self.id);
        }
        out
    }
}

impl fmt::Display for DockerImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.exact())
    }
}

/// Image metadata as reported by a daemon, a registry or an image stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub config: ImageConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    /// Port specs such as `8080/tcp`
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub exposed_ports: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub volumes: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cmd: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entrypoint: Vec<String>,
}

fn image_api_version() -> String {
    "image.openshift.io/v1".to_string()
}

fn image_stream_kind() -> String {
    "ImageStream".to_string()
}

fn image_stream_tag_kind() -> String {
    "ImageStreamTag".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStream {
    #[serde(default = "image_api_version")]
    pub api_version: String,
    #[serde(default = "image_stream_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ImageStreamSpec,
    #[serde(default, skip_serializing_if = "ImageStreamStatus::is_empty")]
    pub status: ImageStreamStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docker_image_repository: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagReference {
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ObjectReference>,

    #[serde(default, skip_serializing_if = "TagImportPolicy::is_default")]
    pub import_policy: TagImportPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagImportPolicy {
    #[serde(default)]
    pub insecure: bool,
}

impl TagImportPolicy {
    fn is_default(&self) -> bool {
        !self.insecure
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docker_image_repository: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<NamedTagEventList>,
}

impl ImageStreamStatus {
    fn is_empty(&self) -> bool {
        self.docker_image_repository.is_empty() && self.tags.is_empty()
    }
}

/// History of images recorded for one tag, newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedTagEventList {
    pub tag: String,
    #[serde(default)]
    pub items: Vec<TagEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagEvent {
    #[serde(default)]
    pub docker_image_reference: String,
    #[serde(default)]
    pub image: String,
}

impl ImageStream {
    pub fn new(metadata: ObjectMeta) -> Self {
        Self {
            api_version: image_api_version(),
            kind: image_stream_kind(),
            metadata,
            spec: ImageStreamSpec::default(),
            status: ImageStreamStatus::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn spec_tag(&self, tag: &str) -> Option<&TagReference> {
        self.spec.tags.iter().find(|t| t.name == tag)
    }

    /// The most recent image recorded for `tag`, if it has a non-empty image id
    pub fn latest_tagged_image(&self, tag: &str) -> Option<&TagEvent> {
        self.status
            .tags
            .iter()
            .find(|t| t.tag == tag)
            .and_then(|t| t.items.first())
            .filter(|event| !event.image.is_empty())
    }

    /// Tags with at least one recorded image, in status order
    pub fn status_tags(&self) -> impl Iterator<Item = &str> {
        self.status.tags.iter().map(|t| t.tag.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamTag {
    #[serde(default = "image_api_version")]
    pub api_version: String,
    #[serde(default = "image_stream_tag_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<TagReference>,
}

impl ImageStreamTag {
    pub fn new(metadata: ObjectMeta, tag: TagReference) -> Self {
        Self {
            api_version: image_api_version(),
            kind: image_stream_tag_kind(),
            metadata,
            tag: Some(tag),
        }
    }
}

/// `stream:tag`
pub fn join_image_stream_tag(stream: &str, tag: &str) -> String {
    format!("{}:{}", stream, tag)
}
