use super::errors::ResolveError;
use super::matches::{ComponentMatch, ComponentMatches, MatchPayload};
use super::scorer::match_tag;
use super::search::Searcher;
use crate::api::{DockerImageReference, ImageMetadata, DEFAULT_IMAGE_TAG};
use crate::client::{ClientError, DockerClient, RegistryClient};
use std::rc::Rc;
use tracing::{debug, trace};

/// Appends the default tag to a query that has none, returning the parsed
/// reference with the tag filled in.
fn with_default_tag(term: &str) -> Option<(String, DockerImageReference)> {
    let mut reference = match DockerImageReference::parse(term) {
        Ok(r) => r,
        Err(err) => {
            trace!(term, error = %err, "not an image reference");
            return None;
        }
    };
    if reference.tag.is_empty() && reference.id.is_empty() {
        reference.tag = DEFAULT_IMAGE_TAG.to_string();
        return Some((format!("{}:{}", term, DEFAULT_IMAGE_TAG), reference));
    }
    Some((term.to_string(), reference))
}

fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    &id[..id.len().min(12)]
}

fn describe(value: &str, image: &ImageMetadata, source: &str) -> String {
    if image.id.is_empty() {
        format!("Docker image {:?} from {}", value, source)
    } else {
        format!(
            "Docker image {:?} ({}) from {}",
            value,
            short_id(&image.id),
            source
        )
    }
}

/// Finds images known to the local Docker daemon.
///
/// When a registry searcher is configured it is asked first, and the daemon
/// is only consulted if the registry had no exact match. A failing registry
/// is only reported when the daemon has nothing either.
pub struct DockerClientSearcher {
    pub client: Rc<dyn DockerClient>,
    pub registry: Option<Rc<dyn Searcher>>,
    pub insecure: bool,
}

impl Searcher for DockerClientSearcher {
    fn search(&self, precise: bool, terms: &[&str]) -> Result<ComponentMatches, ResolveError> {
        let mut results = ComponentMatches::new();
        let mut registry_error = None;
        if let Some(registry) = &self.registry {
            match registry.search(precise, terms) {
                Ok(mut found) => {
                    for m in found.iter_mut() {
                        m.local_only = false;
                    }
                    results.extend(found);
                }
                Err(err) => {
                    debug!(error = %err, "registry search failed, trying the local daemon");
                    registry_error = Some(err);
                }
            }
        }
        if !results.exact().is_empty() {
            return Ok(results.sorted());
        }

        let images = self
            .client
            .list_images()
            .map_err(|err| ResolveError::lookup(&terms.join(","), err))?;

        let mut tagged = Vec::new();
        for term in terms {
            if *term == "*" {
                continue;
            }
            let Some((query, reference)) = with_default_tag(term) else {
                continue;
            };
            for image in &images {
                for tag in match_tag(image, &query, &reference) {
                    tagged.push((tag, image.id.clone()));
                }
            }
        }
        tagged.sort_by(|a, b| a.0.score.total_cmp(&b.0.score));

        for (tag, id) in tagged {
            let image = match self.client.inspect_image(&id) {
                Ok(image) => image,
                Err(err) if err.is_not_found() => {
                    debug!(image = %id, "image disappeared from the daemon");
                    continue;
                }
                Err(err) => return Err(ResolveError::lookup(&tag.value, err)),
            };
            let reference = DockerImageReference::parse(&tag.value).unwrap_or_default();
            trace!(value = %tag.value, score = tag.score, "local image match");
            results.push(ComponentMatch {
                value: tag.value.clone(),
                name: tag.value.clone(),
                argument: format!("--docker-image={:?}", tag.value),
                description: describe(&tag.value, &image, "the local Docker daemon"),
                score: tag.score,
                insecure: self.insecure,
                local_only: true,
                image_tag: reference.tag,
                registry: Some(reference.registry),
                payload: Some(MatchPayload::Image(Box::new(image))),
                ..Default::default()
            });
        }
        match registry_error {
            Some(err) if results.is_empty() => Err(err),
            _ => Ok(results.sorted()),
        }
    }
}

/// Looks up exact `name:tag` references in image registries
pub struct DockerRegistrySearcher {
    pub client: Rc<dyn RegistryClient>,
    pub allow_insecure: bool,
}

impl Searcher for DockerRegistrySearcher {
    fn search(&self, _precise: bool, terms: &[&str]) -> Result<ComponentMatches, ResolveError> {
        let mut results = ComponentMatches::new();
        for term in terms {
            if *term == "*" {
                continue;
            }
            let Some((query, reference)) = with_default_tag(term) else {
                continue;
            };

            let connection = match self.client.connect(&reference.registry, self.allow_insecure) {
                Ok(c) => c,
                Err(ClientError::RegistryNotFound(registry)) => {
                    debug!(term, registry, "registry not found");
                    continue;
                }
                Err(err) => return Err(ResolveError::lookup(term, err)),
            };
            let image = match connection.image_by_tag(
                &reference.namespace,
                &reference.name,
                &reference.tag,
            ) {
                Ok(image) => image,
                Err(err) if err.is_not_found() => {
                    trace!(term, "no such tag in registry");
                    continue;
                }
                Err(err) => return Err(ResolveError::lookup(term, err)),
            };

            debug!(term = %query, "registry image match");
            results.push(ComponentMatch {
                value: query.clone(),
                name: query.clone(),
                argument: format!("--docker-image={:?}", query),
                description: describe(&query, &image, "a Docker registry"),
                score: 0.0,
                insecure: self.allow_insecure,
                image_tag: reference.tag.clone(),
                registry: Some(reference.registry.clone()),
                supports_direct_tagging: true,
                payload: Some(MatchPayload::Image(Box::new(image))),
                ..Default::default()
            });
        }
        Ok(results)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::client::LocalImage;
    use std::collections::BTreeMap;

    /// Daemon with a fixed set of images
    #[derive(Default)]
    pub struct FakeDocker {
        pub images: Vec<LocalImage>,
        pub metadata: BTreeMap<String, ImageMetadata>,
    }

    impl FakeDocker {
        pub fn with_image(mut self, id: &str, tags: &[&str], ports: &[&str]) -> Self {
            self.images.push(LocalImage {
                id: id.to_string(),
                repo_tags: tags.iter().map(|t| t.to_string()).collect(),
            });
            let mut image = ImageMetadata {
                id: id.to_string(),
                ..Default::default()
            };
            image.config.exposed_ports = ports.iter().map(|p| p.to_string()).collect();
            self.metadata.insert(id.to_string(), image);
            self
        }
    }

    impl DockerClient for FakeDocker {
        fn list_images(&self) -> Result<Vec<LocalImage>, ClientError> {
            Ok(self.images.clone())
        }

        fn inspect_image(&self, name: &str) -> Result<ImageMetadata, ClientError> {
            self.metadata
                .get(name)
                .cloned()
                .ok_or_else(|| ClientError::not_found("image", name))
        }
    }
}
