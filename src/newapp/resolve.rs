//! Turning classified inputs into resolved components paired with source

use super::{AppConfig, NewAppError};
use crate::app::{
    is_builder_match, ComponentId, ComponentInput, ComponentMatch, ReferenceBuilder, RepositoryId,
    ResolveError, SourceError, Strategy,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Every component and repository of a run, after resolution
pub struct ResolvedComponents {
    pub builder: ReferenceBuilder,
}

impl ResolvedComponents {
    pub fn components(&self) -> Vec<ComponentId> {
        self.builder.component_ids()
    }

    pub fn repositories(&self) -> Vec<RepositoryId> {
        self.builder.repository_ids()
    }

    fn is_template(&self, id: ComponentId) -> bool {
        self.builder
            .component(id)
            .resolved_match
            .as_ref()
            .map_or(false, ComponentMatch::is_template)
    }

    /// Components that resolved to an image
    pub fn image_components(&self) -> Vec<ComponentId> {
        self.components()
            .into_iter()
            .filter(|id| !self.is_template(*id))
            .collect()
    }

    pub fn template_components(&self) -> Vec<ComponentId> {
        self.components()
            .into_iter()
            .filter(|id| self.is_template(*id))
            .collect()
    }

    /// Groups of image components, in order of first appearance
    pub fn image_groups(&self) -> Vec<Vec<ComponentId>> {
        self.builder
            .groups()
            .into_iter()
            .map(|group| group.into_iter().filter(|id| !self.is_template(*id)).collect::<Vec<_>>())
            .filter(|group| !group.is_empty())
            .collect()
    }

    /// Components that build from a repository
    pub fn with_source(&self) -> Vec<ComponentId> {
        self.components()
            .into_iter()
            .filter(|id| self.builder.component(*id).uses().is_some())
            .collect()
    }
}

/// A match for an image that only has to exist when the build runs
fn virtual_match(value: &str) -> ComponentMatch {
    ComponentMatch {
        value: value.to_string(),
        argument: format!("--docker-image={:?}", value),
        name: value.to_string(),
        description: "Image expected to be available when the build runs".to_string(),
        is_virtual: true,
        ..Default::default()
    }
}

fn effective_strategy(repository: Strategy, requested: Strategy) -> Strategy {
    match repository {
        Strategy::Unspecified => requested,
        strategy => strategy,
    }
}

impl AppConfig {
    /// Adds every declared input to a fresh builder, attaching the resolver
    /// and searcher of its kind
    pub(crate) fn component_builder(&self) -> Result<ReferenceBuilder, NewAppError> {
        let r = &self.resolvers;
        let g = &self.generation;
        let mut b = ReferenceBuilder::new(Arc::clone(self.fs()));

        for location in &self.inputs.source_repositories {
            b.add_source_repository(location, g.strategy);
        }

        b.add_components(&self.inputs.docker_images, |input| {
            input.argument = format!("--docker-image={:?}", input.from);
            input.expect_to_build |= g.expect_to_build;
            input.resolver = r.docker_resolver();
            input.searcher = r.docker_searcher.clone();
        });
        b.add_components(&self.inputs.image_streams, |input| {
            input.argument = format!("--image-stream={:?}", input.from);
            input.expect_to_build |= g.expect_to_build;
            input.resolver = r.image_stream_resolver();
            input.searcher = r.image_stream_searcher.clone();
        });
        b.add_components(&self.inputs.templates, |input| {
            input.argument = format!("--template={:?}", input.from);
            input.resolver = r.template_resolver();
            input.searcher = r.template_searcher.clone();
        });
        b.add_components(&self.inputs.template_files, |input| {
            input.argument = format!("--file={:?}", input.from);
            input.resolver = r.template_file_resolver();
            input.searcher = r.template_file_searcher.clone();
        });
        b.add_components(&self.inputs.components, |input| {
            input.expect_to_build |= g.expect_to_build;
            input.resolver = r.generic_resolver(input.expect_to_build);
            input.searcher = Some(r.generic_searcher());
        });
        b.add_groups(&self.inputs.groups);

        if !g.context_dir.is_empty() {
            for id in b.repository_ids() {
                b.repository_mut(id).set_context_dir(g.context_dir.clone());
            }
        }

        NewAppError::aggregate(b.take_errors())?;
        Ok(b)
    }

    fn builds_with_docker(&self, b: &ReferenceBuilder, id: ComponentId) -> bool {
        let component = b.component(id);
        if !component.expect_to_build {
            return false;
        }
        let repository = component
            .uses()
            .map_or(Strategy::Unspecified, |repo| b.repository(repo).strategy());
        effective_strategy(repository, self.generation.strategy) == Strategy::Docker
    }

    /// Resolves each component, collecting every failure.
    ///
    /// With `exact_only`, a match with a nonzero score is an error asking the
    /// user to restate the argument.
    fn resolve_components(
        &self,
        b: &mut ReferenceBuilder,
        ids: &[ComponentId],
        exact_only: bool,
    ) -> Result<(), NewAppError> {
        let mut errors: Vec<NewAppError> = Vec::new();
        for &id in ids {
            let docker = self.builds_with_docker(b, id);
            let component = b.component_mut(id);
            if component.resolved_match.is_some() {
                continue;
            }
            match component.resolve() {
                Ok(()) => {}
                Err(err) if docker && err.is_no_match() => {
                    warn!(
                        image = %component.value,
                        "no image found, it is expected to be available when the Docker build runs"
                    );
                    component.resolved_match = Some(virtual_match(&component.value));
                }
                Err(err) => {
                    errors.push(err.into());
                    continue;
                }
            }
            if !exact_only {
                continue;
            }
            let Some(m) = &component.resolved_match else {
                continue;
            };
            if m.exact() || m.is_virtual {
                continue;
            }
            let value = component.from.clone();
            let matched = Box::new(m.clone());
            errors.push(
                if m.no_tags_found {
                    ResolveError::NoTagsFound { value, matched }
                } else {
                    ResolveError::PartialMatch { value, matched }
                }
                .into(),
            );
        }
        NewAppError::aggregate(errors)
    }

    /// Checks out and inspects every repository
    fn detect_source(&self, b: &mut ReferenceBuilder) -> Result<(), NewAppError> {
        let mut errors: Vec<SourceError> = Vec::new();
        for id in b.repository_ids() {
            let repo = b.repository_mut(id);
            let strategy = effective_strategy(repo.strategy(), self.generation.strategy);
            let dir = match repo.prepare_local(self.resolvers.git.as_ref()) {
                Ok(dir) => dir,
                Err(err) => {
                    errors.push(err);
                    continue;
                }
            };
            let info = match self
                .resolvers
                .detector
                .detect(&dir, strategy == Strategy::Docker)
            {
                Ok(info) => info,
                Err(source) => {
                    errors.push(SourceError::Access {
                        location: repo.location().to_string(),
                        source,
                    });
                    continue;
                }
            };

            if strategy == Strategy::Docker && info.dockerfile.is_none() {
                errors.push(SourceError::NoDockerfile {
                    location: repo.location().to_string(),
                });
            }
            if !self.generation.allow_non_numeric_exposed_ports
                && matches!(strategy, Strategy::Unspecified | Strategy::Docker)
            {
                if let Some(dockerfile) = &info.dockerfile {
                    errors.extend(dockerfile.invalid_ports().into_iter().map(|port| {
                        SourceError::InvalidExposedPort {
                            port: port.to_string(),
                        }
                    }));
                }
            }
            repo.set_strategy(strategy);
            repo.set_info(info);
        }
        NewAppError::aggregate(errors)
    }

    /// Adds a builder component for every repository nothing builds yet.
    ///
    /// A Dockerfile selects its last `FROM` image; otherwise the first
    /// detected language is matched against builder images.
    fn add_missing_components(
        &self,
        b: &mut ReferenceBuilder,
    ) -> Result<Vec<ComponentId>, NewAppError> {
        let mut added = Vec::new();
        let mut errors: Vec<SourceError> = Vec::new();
        for repo_id in b.unused_repositories() {
            let repo = b.repository(repo_id);
            let info = repo.info().cloned().unwrap_or_default();
            let docker = matches!(repo.strategy(), Strategy::Unspecified | Strategy::Docker);

            let (mut input, with_docker) = match &info.dockerfile {
                Some(dockerfile) if docker => {
                    let Some(from) = dockerfile.last_from() else {
                        errors.push(SourceError::NoFromInstruction(info.path.clone()));
                        continue;
                    };
                    let mut input = ComponentInput::new(from);
                    input.resolver = self.resolvers.dockerfile_base_resolver();
                    (input, true)
                }
                _ => {
                    let Some(term) = info.terms().into_iter().next() else {
                        errors.push(SourceError::NoLanguageDetected {
                            location: repo.location().to_string(),
                        });
                        continue;
                    };
                    let mut input = ComponentInput::new(&term);
                    input.resolver = self.resolvers.language_builder_resolver();
                    (input, false)
                }
            };
            input.expect_to_build = true;
            info!(
                source = repo.location(),
                builder = %input.value,
                docker = with_docker,
                "Adding builder for source repository"
            );

            if with_docker {
                b.repository_mut(repo_id).build_with_docker();
            }
            let id = b.add_component(input);
            b.use_source(id, repo_id);
            added.push(id);
        }
        NewAppError::aggregate(errors)?;
        Ok(added)
    }

    /// Resolves every input, detects source and pairs it with builders
    pub fn resolve(&self) -> Result<ResolvedComponents, NewAppError> {
        let mut b = self.component_builder()?;

        let requested = b.component_ids();
        self.resolve_components(&mut b, &requested, true)?;

        self.detect_source(&mut b)?;

        let needs_source = b.needs_source();
        let unused = b.unused_repositories();
        b.ensure_has_source(&needs_source, &unused)?;

        let added = self.add_missing_components(&mut b)?;
        self.resolve_components(&mut b, &added, false)?;

        for id in b.repository_ids() {
            let repo = b.repository_mut(id);
            if repo.strategy() == Strategy::Unspecified {
                repo.set_strategy(Strategy::Source);
            }
        }
        for id in b.component_ids() {
            if let Some(m) = b.component_mut(id).resolved_match.as_mut() {
                m.builder = is_builder_match(m);
            }
        }
        debug!(
            components = b.component_ids().len(),
            repositories = b.repository_ids().len(),
            "Resolved components"
        );
        Ok(ResolvedComponents { builder: b })
    }
}
