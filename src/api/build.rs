use super::meta::{EnvVar, ObjectMeta, ObjectReference};
use serde::{Deserialize, Serialize};

fn build_api_version() -> String {
    "build.openshift.io/v1".to_string()
}

fn build_config_kind() -> String {
    "BuildConfig".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    #[serde(default = "build_api_version")]
    pub api_version: String,
    #[serde(default = "build_config_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: BuildConfigSpec,
}

impl BuildConfig {
    pub fn new(metadata: ObjectMeta, spec: BuildConfigSpec) -> Self {
        Self {
            api_version: build_api_version(),
            kind: build_config_kind(),
            metadata,
            spec,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfigSpec {
    #[serde(default)]
    pub triggers: Vec<BuildTriggerPolicy>,
    #[serde(default)]
    pub source: BuildSource,
    #[serde(default)]
    pub strategy: BuildStrategy,
    #[serde(default)]
    pub output: BuildOutput,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSource {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub source_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitBuildSource>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context_dir: String,

    /// Marks a build whose source is uploaded by the client
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub binary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitBuildSource {
    pub uri: String,
    #[serde(rename = "ref", default, skip_serializing_if = "String::is_empty")]
    pub git_ref: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStrategy {
    #[serde(rename = "type")]
    pub strategy_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_strategy: Option<SourceBuildStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_strategy: Option<DockerBuildStrategy>,
}

impl BuildStrategy {
    /// The image the build starts from, whichever strategy is set
    pub fn input_reference(&self) -> Option<&ObjectReference> {
        if let Some(source) = &self.source_strategy {
            return Some(&source.from);
        }
        self.docker_strategy.as_ref().and_then(|d| d.from.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceBuildStrategy {
    pub from: ObjectReference,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DockerBuildStrategy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ObjectReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<ObjectReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTriggerPolicy {
    #[serde(rename = "type")]
    pub trigger_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<WebHookTrigger>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic: Option<WebHookTrigger>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_change: Option<ImageChangeTrigger>,
}

impl BuildTriggerPolicy {
    pub fn config_change() -> Self {
        Self {
            trigger_type: "ConfigChange".to_string(),
            ..Default::default()
        }
    }

    pub fn image_change() -> Self {
        Self {
            trigger_type: "ImageChange".to_string(),
            image_change: Some(ImageChangeTrigger::default()),
            ..Default::default()
        }
    }

    pub fn github(secret: String) -> Self {
        Self {
            trigger_type: "GitHub".to_string(),
            github: Some(WebHookTrigger { secret }),
            ..Default::default()
        }
    }

    pub fn generic(secret: String) -> Self {
        Self {
            trigger_type: "Generic".to_string(),
            generic: Some(WebHookTrigger { secret }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebHookTrigger {
    pub secret: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageChangeTrigger {}
