//! Component resolution and pipeline assembly
//!
//! User arguments become [`ComponentInput`]s owned by a [`ReferenceBuilder`].
//! Each component resolves through a [`Resolver`] built from one or more
//! [`Searcher`]s; resolved components are paired with source repositories
//! and turned into [`Pipeline`]s whose objects are emitted through
//! [`Acceptor`] gates.

pub mod acceptor;
pub mod builder;
pub mod component;
pub mod docker_lookup;
pub mod env;
pub mod errors;
pub mod imageref;
pub mod imagestream_lookup;
pub mod matches;
pub mod naming;
pub mod pipeline;
pub mod resolvers;
pub mod scorer;
pub mod search;
pub mod source;
pub mod template_lookup;

pub use acceptor::{
    AcceptFirst, AcceptNew, AcceptNonExistentImageStream, AcceptUnique, Acceptor, Acceptors,
};
pub use builder::{BuilderError, ReferenceBuilder};
pub use component::{is_builder_match, ComponentId, ComponentInput};
pub use docker_lookup::{DockerClientSearcher, DockerRegistrySearcher};
pub use env::{is_environment_argument, Environment, EnvironmentError};
pub use errors::{ResolveError, SourceError};
pub use imageref::ImageRef;
pub use imagestream_lookup::{ImageStreamByAnnotationSearcher, ImageStreamSearcher};
pub use matches::{ComponentMatch, ComponentMatches, MatchPayload};
pub use naming::{sanitize_name, InvalidNameError, UniqueNameGenerator};
pub use pipeline::{
    add_services, pipeline_objects, strategy_and_source_for_repository, BuildRef,
    BuildStrategyRef, DeploymentConfigRef, Pipeline, PipelineBuilder, PipelineError,
    PipelineGroup, SourceRef,
};
pub use resolvers::{
    FirstMatchResolver, HighestScoreResolver, HighestUniqueScoreResolver,
    PerfectMatchWeightedResolver, Resolver, UniqueExactOrInexactMatchResolver, WeightedResolver,
};
pub use scorer::{partial_scorer, string_proximity_scorer, SCORE_THRESHOLD};
pub use search::{MultiSimpleSearcher, MultiWeightedSearcher, Searcher, WeightedSearcher};
pub use source::{is_remote_repository, RepositoryId, SourceRepository, Strategy};
pub use template_lookup::{TemplateFileSearcher, TemplateSearcher};
