use super::matches::{ComponentMatch, ComponentMatches};
use crate::client::ClientError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while resolving a component to a single match
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no match for {value:?}{}", qualifier_suffix(.qualifier))]
    NoMatch {
        value: String,
        qualifier: Option<String>,
    },

    #[error("multiple images or templates matched {value:?}")]
    MultipleMatches {
        value: String,
        matches: ComponentMatches,
    },

    #[error("only a partial match was found for {value:?}: {:?}", .matched.name)]
    PartialMatch {
        value: String,
        matched: Box<ComponentMatch>,
    },

    #[error("no tags found on matching image stream: {:?}", .matched.name)]
    NoTagsFound {
        value: String,
        matched: Box<ComponentMatch>,
    },

    #[error("unable to search for {value:?}: {source}")]
    Lookup {
        value: String,
        #[source]
        source: ClientError,
    },

    #[error("{message}")]
    TemplateFile { path: String, message: String },
}

fn qualifier_suffix(qualifier: &Option<String>) -> String {
    match qualifier {
        Some(q) => format!(": {}", q),
        None => String::new(),
    }
}

impl ResolveError {
    pub fn no_match(value: &str) -> Self {
        ResolveError::NoMatch {
            value: value.to_string(),
            qualifier: None,
        }
    }

    pub fn lookup(value: &str, source: ClientError) -> Self {
        ResolveError::Lookup {
            value: value.to_string(),
            source,
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, ResolveError::NoMatch { .. })
    }

    /// A usage hint listing how the user can restate an ambiguous or
    /// partial match.
    pub fn help_message(&self) -> Option<String> {
        match self {
            ResolveError::MultipleMatches { value, matches } => {
                let mut out = format!(
                    "The argument {:?} could apply to the following images, image streams, or templates:\n\n",
                    value
                );
                for m in matches {
                    out.push_str(&format!(
                        "* {}\n  {}\n  Use {} to specify this image or template\n\n",
                        m.name, m.description, m.argument
                    ));
                }
                Some(out)
            }
            ResolveError::PartialMatch { value, matched } => Some(format!(
                "The argument {:?} only partially matched the following image, image stream, or template:\n\n\
                 * {}\n  {}\n  Use {} to specify this image or template\n",
                value, matched.name, matched.description, matched.argument
            )),
            ResolveError::NoTagsFound { value, matched } => Some(format!(
                "The image stream {} matching {:?} has no tags with images yet.\n\
                 Use {} to use the image stream anyway.\n",
                matched.name, value, matched.argument
            )),
            ResolveError::NoMatch { value, .. } => Some(format!(
                "The argument {:?} did not match any images, image streams, templates or source locations.\n\
                 Use --docker-image, --image-stream, --template, --file or --code to say what it is.\n",
                value
            )),
            _ => None,
        }
    }
}

/// Errors about source repositories and their pairing with builders
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{location:?} is not a valid source location: {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("unable to prepare source from {location:?}: {source}")]
    Access {
        location: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("no source code was provided for {}; use --code to point at a source repository", .components.join(", "))]
    NoSourceProvided { components: Vec<String> },

    #[error("there are multiple code locations provided - use one of the following suggestions to declare which code goes with the image:\n{}", .suggestions.join("\n"))]
    AmbiguousSource { suggestions: Vec<String> },

    #[error("the following images require source code: {}\n and the following repositories are not used: {}\nUse '[image]~[repo]' to declare which code goes with which image", .components.join(", "), .repositories.join(", "))]
    UnpairedSources {
        components: Vec<String>,
        repositories: Vec<String>,
    },

    #[error("No language matched the source repository {location:?}")]
    NoLanguageDetected { location: String },

    #[error("the Dockerfile in the repository {0:?} has no FROM instruction")]
    NoFromInstruction(PathBuf),

    #[error("No Dockerfile was found in the repository {location:?} and the requested build strategy is 'docker'")]
    NoDockerfile { location: String },

    #[error("the Dockerfile has an invalid EXPOSE instruction: could not parse {port:?}: must be numeric")]
    InvalidExposedPort { port: String },
}
