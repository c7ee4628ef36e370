//! The `new-app` / `new-build` command engine
//!
//! [`AppConfig`] collects classified arguments and the collaborators used to
//! look them up. [`AppConfig::run`] resolves everything into an object list;
//! [`AppConfig::run_query`] only searches.

mod classify;
mod resolve;
mod run;
mod templates;

pub use classify::{is_component_reference, ArgumentKind, Classification, ClassificationError};
pub use resolve::ResolvedComponents;
pub use run::{validate_enforced_name, validate_output_image_reference};

use crate::api::ObjectList;
use crate::app::{
    BuilderError, ComponentMatch, DockerClientSearcher, DockerRegistrySearcher, EnvironmentError,
    FirstMatchResolver, HighestScoreResolver, HighestUniqueScoreResolver,
    ImageStreamByAnnotationSearcher, ImageStreamSearcher, MultiWeightedSearcher,
    PerfectMatchWeightedResolver, PipelineError, ResolveError, Resolver, Searcher, SourceError,
    Strategy, TemplateFileSearcher, TemplateSearcher, UniqueExactOrInexactMatchResolver,
    WeightedResolver, WeightedSearcher,
};
use crate::client::{DockerClient, Git, ImageStreamClient, RegistryClient, TemplateClient};
use crate::detect::{Detector, SourceRepositoryEnumerator};
use crate::fs::FileSystem;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NewAppError {
    #[error("no inputs provided")]
    NoInputs,

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Builder(#[from] BuilderError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error("the image match {image:?} for source repository {repository:?} does not appear to be a source-to-image builder.\n\n- to attempt to use this image as a source builder, pass \"--strategy=source\"\n- to use it as a base image for a Docker build, pass \"--strategy=docker\"")]
    NotABuilder { image: String, repository: String },

    #[error("invalid name: {0}. Must be an a lower case alphanumeric (a-z, and 0-9) string with a maximum length of 58 characters, where the first character is a letter (a-z), and the '-' character is allowed anywhere except the first or last character.")]
    InvalidName(String),

    #[error("invalid output image reference: {0}")]
    InvalidOutputReference(String),

    #[error("{0}")]
    InvalidArguments(String),

    #[error("unable to process template {name:?}: {message}")]
    Template { name: String, message: String },

    #[error("output image of {reference:?} should be different than input{hint}")]
    CircularOutput { reference: String, hint: &'static str },

    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n"))]
    Aggregate(Vec<NewAppError>),
}

impl NewAppError {
    /// Folds collected errors into one, or `Ok` when there are none
    pub fn aggregate<E: Into<NewAppError>>(errors: Vec<E>) -> Result<(), NewAppError> {
        let mut errors: Vec<NewAppError> = errors.into_iter().map(Into::into).collect();
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(NewAppError::Aggregate(errors)),
        }
    }

    /// Every leaf error, flattening aggregates
    pub fn errors(&self) -> Vec<&NewAppError> {
        match self {
            NewAppError::Aggregate(errors) => errors.iter().flat_map(|e| e.errors()).collect(),
            other => vec![other],
        }
    }

    /// Usage hints for the resolution errors contained in this error
    pub fn help_message(&self) -> Option<String> {
        let hints: Vec<String> = self
            .errors()
            .into_iter()
            .filter_map(|e| match e {
                NewAppError::Resolve(err) => err.help_message(),
                _ => None,
            })
            .collect();
        (!hints.is_empty()).then(|| hints.join("\n"))
    }
}

/// Component arguments grouped by the kind the user declared
#[derive(Debug, Clone, Default)]
pub struct ComponentInputs {
    pub source_repositories: Vec<String>,
    /// Arguments of unknown kind
    pub components: Vec<String>,
    pub image_streams: Vec<String>,
    pub docker_images: Vec<String>,
    pub templates: Vec<String>,
    pub template_files: Vec<String>,
    pub groups: Vec<String>,
}

impl ComponentInputs {
    pub fn has_arguments(&self) -> bool {
        !self.components.is_empty()
            || !self.image_streams.is_empty()
            || !self.docker_images.is_empty()
            || !self.templates.is_empty()
            || !self.template_files.is_empty()
    }
}

/// Options that shape the generated objects
#[derive(Debug, Clone, Default)]
pub struct GenerationInputs {
    pub environment: Vec<String>,
    pub build_environment: Vec<String>,
    pub template_parameters: Vec<String>,
    pub labels: BTreeMap<String, String>,
    pub ignore_unknown_parameters: bool,
    pub insecure_registry: bool,
    pub strategy: Strategy,
    pub name: String,
    pub to: String,
    pub output_docker: bool,
    /// Every image component builds source (`new-build`)
    pub expect_to_build: bool,
    pub context_dir: String,
    pub allow_missing_image_stream_tags: bool,
    pub allow_non_numeric_exposed_ports: bool,
    /// Generate deployment configs and services
    pub deploy: bool,
}

/// The searchers and collaborators used to resolve components
pub struct Resolvers {
    pub docker_searcher: Option<Rc<dyn Searcher>>,
    pub image_stream_searcher: Option<Rc<dyn Searcher>>,
    pub image_stream_by_annotation_searcher: Option<Rc<dyn Searcher>>,
    pub template_searcher: Option<Rc<dyn Searcher>>,
    pub template_file_searcher: Option<Rc<dyn Searcher>>,
    pub detector: Rc<dyn Detector>,
    pub git: Rc<dyn Git>,
}

fn weighted(searchers: &[(&Option<Rc<dyn Searcher>>, f32)]) -> Vec<WeightedResolver> {
    searchers
        .iter()
        .filter_map(|(searcher, weight)| {
            searcher.as_ref().map(|s| WeightedResolver {
                searcher: Rc::clone(s),
                weight: *weight,
            })
        })
        .collect()
}

fn perfect_match(resolvers: Vec<WeightedResolver>) -> Option<Rc<dyn Resolver>> {
    (!resolvers.is_empty())
        .then(|| Rc::new(PerfectMatchWeightedResolver(resolvers)) as Rc<dyn Resolver>)
}

impl Resolvers {
    pub fn docker_resolver(&self) -> Option<Rc<dyn Resolver>> {
        self.docker_searcher.as_ref().map(|s| {
            Rc::new(UniqueExactOrInexactMatchResolver {
                searcher: Rc::clone(s),
            }) as Rc<dyn Resolver>
        })
    }

    pub fn image_stream_resolver(&self) -> Option<Rc<dyn Resolver>> {
        self.image_stream_searcher.as_ref().map(|s| {
            Rc::new(HighestScoreResolver {
                searcher: Rc::clone(s),
            }) as Rc<dyn Resolver>
        })
    }

    pub fn template_resolver(&self) -> Option<Rc<dyn Resolver>> {
        self.template_searcher.as_ref().map(|s| {
            Rc::new(HighestUniqueScoreResolver {
                searcher: Rc::clone(s),
            }) as Rc<dyn Resolver>
        })
    }

    pub fn template_file_resolver(&self) -> Option<Rc<dyn Resolver>> {
        self.template_file_searcher.as_ref().map(|s| {
            Rc::new(FirstMatchResolver {
                searcher: Rc::clone(s),
            }) as Rc<dyn Resolver>
        })
    }

    /// Resolver for arguments of unknown kind; templates are skipped for
    /// components that must build
    pub fn generic_resolver(&self, expect_to_build: bool) -> Option<Rc<dyn Resolver>> {
        let mut searchers = vec![(&self.image_stream_searcher, 0.0)];
        if !expect_to_build {
            searchers.push((&self.template_searcher, 0.0));
            searchers.push((&self.template_file_searcher, 0.0));
        }
        searchers.push((&self.docker_searcher, 2.0));
        perfect_match(weighted(&searchers))
    }

    /// Searcher listing every candidate for arguments of unknown kind
    pub fn generic_searcher(&self) -> Rc<dyn Searcher> {
        let searchers = [
            (&self.image_stream_searcher, 0.0),
            (&self.template_searcher, 0.0),
            (&self.docker_searcher, 1.0),
        ];
        Rc::new(MultiWeightedSearcher(
            searchers
                .iter()
                .filter_map(|(searcher, weight)| {
                    searcher.as_ref().map(|s| WeightedSearcher {
                        searcher: Rc::clone(s),
                        weight: *weight,
                    })
                })
                .collect(),
        ))
    }

    /// Resolver for the `FROM` image of a detected Dockerfile
    pub fn dockerfile_base_resolver(&self) -> Option<Rc<dyn Resolver>> {
        perfect_match(weighted(&[
            (&self.image_stream_searcher, 0.0),
            (&self.docker_searcher, 1.0),
        ]))
    }

    /// Resolver for a builder of a detected language
    pub fn language_builder_resolver(&self) -> Option<Rc<dyn Resolver>> {
        perfect_match(weighted(&[
            (&self.image_stream_by_annotation_searcher, 0.0),
            (&self.image_stream_searcher, 1.0),
            (&self.docker_searcher, 2.0),
        ]))
    }
}

/// The configuration of one `new-app` or `new-build` invocation
pub struct AppConfig {
    pub inputs: ComponentInputs,
    pub generation: GenerationInputs,
    pub resolvers: Resolvers,
    pub classification: Classification,

    pub as_search: bool,
    pub as_list: bool,

    /// Namespace the objects are created in
    pub origin_namespace: String,
    pub image_client: Option<Rc<dyn ImageStreamClient>>,
    fs: Arc<dyn FileSystem>,
}

/// The generated objects of a run
#[derive(Debug)]
pub struct AppResult {
    pub list: ObjectList,
    pub name: String,
    pub has_source: bool,
    pub namespace: String,
}

/// The candidates found by `--search` or `--list`
#[derive(Debug)]
pub struct QueryResult {
    pub matches: Vec<ComponentMatch>,
    pub list: ObjectList,
}

impl AppConfig {
    /// A configuration without cluster or Docker lookups
    pub fn new(fs: Arc<dyn FileSystem>, git: Rc<dyn Git>) -> Self {
        Self {
            inputs: ComponentInputs::default(),
            generation: GenerationInputs {
                deploy: true,
                ..Default::default()
            },
            resolvers: Resolvers {
                docker_searcher: None,
                image_stream_searcher: None,
                image_stream_by_annotation_searcher: None,
                template_searcher: None,
                template_file_searcher: Some(Rc::new(TemplateFileSearcher { fs: Arc::clone(&fs) })),
                detector: Rc::new(SourceRepositoryEnumerator::new(Arc::clone(&fs))),
                git,
            },
            classification: Classification::default(),
            as_search: false,
            as_list: false,
            origin_namespace: String::new(),
            image_client: None,
            fs,
        }
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Searches image streams and templates in `namespace`, then in
    /// `shared_namespace`
    pub fn set_cluster_clients(
        &mut self,
        images: Rc<dyn ImageStreamClient>,
        templates: Rc<dyn TemplateClient>,
        namespace: &str,
        shared_namespace: &str,
    ) {
        self.origin_namespace = namespace.to_string();
        let mut namespaces = vec![namespace.to_string()];
        if !shared_namespace.is_empty() && namespace != shared_namespace {
            namespaces.push(shared_namespace.to_string());
        }
        self.resolvers.image_stream_searcher = Some(Rc::new(ImageStreamSearcher {
            client: Rc::clone(&images),
            namespaces: namespaces.clone(),
            allow_missing_tags: self.generation.allow_missing_image_stream_tags,
        }));
        self.resolvers.image_stream_by_annotation_searcher = Some(Rc::new(
            ImageStreamByAnnotationSearcher::new(Rc::clone(&images), namespaces.clone()),
        ));
        self.resolvers.template_searcher = Some(Rc::new(TemplateSearcher {
            client: templates,
            namespaces,
        }));
        self.image_client = Some(images);
    }

    /// Searches the registry, then the local daemon when one is given
    pub fn set_docker_clients(
        &mut self,
        docker: Option<Rc<dyn DockerClient>>,
        registry: Rc<dyn RegistryClient>,
    ) {
        let insecure = self.generation.insecure_registry;
        let registry: Rc<dyn Searcher> = Rc::new(DockerRegistrySearcher {
            client: registry,
            allow_insecure: insecure,
        });
        self.resolvers.docker_searcher = Some(match docker {
            Some(client) => Rc::new(DockerClientSearcher {
                client,
                registry: Some(registry),
                insecure,
            }),
            None => registry,
        });
    }

    pub fn querying(&self) -> bool {
        self.as_list || self.as_search
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("inputs", &self.inputs)
            .field("generation", &self.generation)
            .field("origin_namespace", &self.origin_namespace)
            .field("as_search", &self.as_search)
            .field("as_list", &self.as_list)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_of_one_is_that_error() {
        let err = NewAppError::aggregate(vec![NewAppError::NoInputs]).unwrap_err();
        assert!(matches!(err, NewAppError::NoInputs));
        assert!(NewAppError::aggregate(Vec::<NewAppError>::new()).is_ok());
    }

    #[test]
    fn test_aggregate_renders_one_error_per_line() {
        let err = NewAppError::aggregate(vec![
            NewAppError::from(ResolveError::no_match("ruby")),
            NewAppError::from(ResolveError::no_match("mysql")),
        ])
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "no match for \"ruby\"\nno match for \"mysql\""
        );
        assert_eq!(err.errors().len(), 2);
        assert!(err.help_message().unwrap().contains("\"mysql\""));
    }

    #[test]
    fn test_circular_output_message() {
        let err = NewAppError::CircularOutput {
            reference: "ruby:latest".to_string(),
            hint: ", set a different tag with --to",
        };
        assert_eq!(
            err.to_string(),
            "output image of \"ruby:latest\" should be different than input, set a different tag with --to"
        );
    }
}
