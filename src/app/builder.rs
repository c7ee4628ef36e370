//! Component grammar and source pairing
//!
//! `a+b` lists components deployed together, `image~repo` pairs a builder
//! with source code, and `--group a+b` merges components added separately.

use super::component::{ComponentId, ComponentInput};
use super::errors::SourceError;
use super::source::{RepositoryId, SourceRepository, Strategy};
use crate::fs::FileSystem;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("when using '[image]~[code]' form for {0:?}, you must specify a image name")]
    MissingImageName(String),

    #[error("group {0:?} only contains a single name")]
    SingleNameGroup(String),

    #[error("the name {0:?} from the group definition is not in use, and can't be used")]
    UnknownGroupName(String),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Splits `image~repo`; the bool reports whether `~` was present
fn component_with_source(s: &str) -> Result<(&str, Option<&str>, bool), BuilderError> {
    match s.split_once('~') {
        None => Ok((s, None, false)),
        Some(("", _)) => Err(BuilderError::MissingImageName(s.to_string())),
        Some((image, "")) => Ok((image, None, true)),
        Some((image, repo)) => Ok((image, Some(repo), true)),
    }
}

/// Owns every component and source repository of one invocation.
///
/// Components and repositories refer to each other by id; the builder is
/// the only owner of either.
pub struct ReferenceBuilder {
    fs: Arc<dyn FileSystem>,
    components: Vec<ComponentInput>,
    repositories: Vec<SourceRepository>,
    errors: Vec<BuilderError>,
    group_id: usize,
}

impl ReferenceBuilder {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            components: Vec::new(),
            repositories: Vec::new(),
            errors: Vec::new(),
            group_id: 0,
        }
    }

    /// Adds the components named by `inputs`.
    ///
    /// Every input token is its own group, and `+` joined entries of one
    /// token share it. A `~repo` in a token pairs that repository with every
    /// component of the token; only entries written with `~` are expected to
    /// build. `configure` attaches the resolver and searcher for the kind of
    /// input being added.
    pub fn add_components<F>(&mut self, inputs: &[String], mut configure: F) -> Vec<ComponentId>
    where
        F: FnMut(&mut ComponentInput),
    {
        let mut added = Vec::new();
        for token in inputs {
            let mut entries = Vec::new();
            let mut token_repo = None;
            for segment in token.split('+') {
                match component_with_source(segment) {
                    Ok((image, repo, builds)) => {
                        if let Some(location) = repo {
                            match self.add_source_repository(location, Strategy::Unspecified) {
                                Some(id) => {
                                    token_repo.get_or_insert(id);
                                    entries.push((image, Some(id), builds));
                                }
                                None => continue,
                            }
                        } else {
                            entries.push((image, None, builds));
                        }
                    }
                    Err(err) => self.errors.push(err),
                }
            }

            for (image, repo, builds) in entries {
                let mut input = ComponentInput::new(image);
                input.expect_to_build = builds;
                input.group_id = self.group_id;
                configure(&mut input);
                let id = self.push_component(input);
                if let Some(repo) = repo.or(token_repo) {
                    self.use_source(id, repo);
                }
                added.push(id);
            }
            self.group_id += 1;
        }
        added
    }

    /// Adds a component outside the grammar, in a group of its own
    pub fn add_component(&mut self, mut input: ComponentInput) -> ComponentId {
        input.group_id = self.group_id;
        self.group_id += 1;
        self.push_component(input)
    }

    fn push_component(&mut self, input: ComponentInput) -> ComponentId {
        let id = ComponentId(self.components.len());
        self.components.push(input);
        id
    }

    /// Merges the groups of the components named in each `a+b` input
    pub fn add_groups(&mut self, inputs: &[String]) {
        for group in inputs {
            let names: Vec<&str> = group.split('+').collect();
            if names.len() == 1 {
                self.errors.push(BuilderError::SingleNameGroup(group.clone()));
                continue;
            }
            let mut target = None;
            for name in names {
                let Some(component) = self.components.iter_mut().find(|c| c.value == name) else {
                    self.errors.push(BuilderError::UnknownGroupName(name.to_string()));
                    break;
                };
                match target {
                    None => target = Some(component.group_id),
                    Some(group_id) => component.group_id = group_id,
                }
            }
        }
    }

    /// Adds a repository unless one with the same location exists.
    ///
    /// Invalid locations are recorded as errors and yield `None`.
    pub fn add_source_repository(&mut self, location: &str, strategy: Strategy) -> Option<RepositoryId> {
        if let Some(pos) = self.repositories.iter().position(|r| r.location() == location) {
            return Some(RepositoryId(pos));
        }
        match SourceRepository::with_strategy(location, self.fs.as_ref(), strategy) {
            Ok(repo) => Some(self.add_existing_repository(repo)),
            Err(err) => {
                self.errors.push(err.into());
                None
            }
        }
    }

    pub fn add_existing_repository(&mut self, repo: SourceRepository) -> RepositoryId {
        if let Some(pos) = self
            .repositories
            .iter()
            .position(|r| r.location() == repo.location())
        {
            return RepositoryId(pos);
        }
        debug!(location = repo.location(), "added source repository");
        self.repositories.push(repo);
        RepositoryId(self.repositories.len() - 1)
    }

    /// Pairs a component with a repository in both directions.
    ///
    /// Re-pairing with another repository drops the old back reference.
    pub fn use_source(&mut self, component: ComponentId, repository: RepositoryId) {
        match self.components[component.0].uses() {
            Some(current) if current == repository => return,
            Some(current) => self.repositories[current.0].remove_user(component),
            None => {}
        }
        self.components[component.0].set_uses(repository);
        self.repositories[repository.0].add_user(component);
    }

    pub fn component(&self, id: ComponentId) -> &ComponentInput {
        &self.components[id.0]
    }

    pub fn component_mut(&mut self, id: ComponentId) -> &mut ComponentInput {
        &mut self.components[id.0]
    }

    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &ComponentInput)> {
        self.components
            .iter()
            .enumerate()
            .map(|(i, c)| (ComponentId(i), c))
    }

    pub fn component_ids(&self) -> Vec<ComponentId> {
        (0..self.components.len()).map(ComponentId).collect()
    }

    pub fn repository(&self, id: RepositoryId) -> &SourceRepository {
        &self.repositories[id.0]
    }

    pub fn repository_mut(&mut self, id: RepositoryId) -> &mut SourceRepository {
        &mut self.repositories[id.0]
    }

    pub fn repositories(&self) -> impl Iterator<Item = (RepositoryId, &SourceRepository)> {
        self.repositories
            .iter()
            .enumerate()
            .map(|(i, r)| (RepositoryId(i), r))
    }

    pub fn repository_ids(&self) -> Vec<RepositoryId> {
        (0..self.repositories.len()).map(RepositoryId).collect()
    }

    /// Repositories no component builds from
    pub fn unused_repositories(&self) -> Vec<RepositoryId> {
        self.repositories()
            .filter(|(_, r)| r.used_by().is_empty())
            .map(|(id, _)| id)
            .collect()
    }

    /// Components that must build but have no repository yet
    pub fn needs_source(&self) -> Vec<ComponentId> {
        self.components()
            .filter(|(_, c)| c.needs_source())
            .map(|(id, _)| id)
            .collect()
    }

    /// Components sharing a group id, groups in order of first appearance
    pub fn groups(&self) -> Vec<Vec<ComponentId>> {
        let mut order: Vec<usize> = Vec::new();
        let mut groups: Vec<Vec<ComponentId>> = Vec::new();
        for (id, component) in self.components() {
            match order.iter().position(|g| *g == component.group_id) {
                Some(pos) => groups[pos].push(id),
                None => {
                    order.push(component.group_id);
                    groups.push(vec![id]);
                }
            }
        }
        groups
    }

    pub fn take_errors(&mut self) -> Vec<BuilderError> {
        std::mem::take(&mut self.errors)
    }

    /// Pairs components that need source with the unused repositories.
    ///
    /// One repository is shared by every such component; several need the
    /// user to say which code goes with which image.
    pub fn ensure_has_source(
        &mut self,
        needs_source: &[ComponentId],
        unused: &[RepositoryId],
    ) -> Result<(), SourceError> {
        if needs_source.is_empty() {
            return Ok(());
        }
        match unused {
            [] => Err(SourceError::NoSourceProvided {
                components: needs_source
                    .iter()
                    .map(|id| self.component(*id).value.clone())
                    .collect(),
            }),
            [repo] => {
                for component in needs_source {
                    info!(
                        component = %self.component(*component).value,
                        source = self.repository(*repo).location(),
                        "Using source repository"
                    );
                    self.use_source(*component, *repo);
                }
                Ok(())
            }
            repos if needs_source.len() == 1 => {
                let value = &self.component(needs_source[0]).value;
                Err(SourceError::AmbiguousSource {
                    suggestions: repos
                        .iter()
                        .map(|r| format!("{}~{}", value, self.repository(*r).location()))
                        .collect(),
                })
            }
            repos => Err(SourceError::UnpairedSources {
                components: needs_source
                    .iter()
                    .map(|id| self.component(*id).value.clone())
                    .collect(),
                repositories: repos
                    .iter()
                    .map(|r| self.repository(*r).location().to_string())
                    .collect(),
            }),
        }
    }
}
