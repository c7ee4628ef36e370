use super::errors::ResolveError;
use super::matches::{ComponentMatch, ComponentMatches, MatchPayload};
use super::scorer::{match_supports_annotation, string_proximity_scorer, SCORE_THRESHOLD};
use super::search::Searcher;
use crate::api::{DockerImageReference, ImageMetadata, ImageStream, DEFAULT_IMAGE_TAG};
use crate::client::ImageStreamClient;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace, warn};

const SUPPORTS_ANNOTATION: &str = "supports";

/// Parses `[namespace/]name[:tag]`; image streams never carry a registry
fn stream_reference(term: &str) -> Option<DockerImageReference> {
    if term == "*" {
        return Some(DockerImageReference {
            name: "*".to_string(),
            ..Default::default()
        });
    }
    match DockerImageReference::parse(term) {
        Ok(r) if r.registry.is_empty() => Some(r),
        Ok(_) => {
            trace!(term, "image stream references cannot name a registry");
            None
        }
        Err(err) => {
            trace!(term, error = %err, "not an image stream reference");
            None
        }
    }
}

fn stream_match(
    term: &str,
    stream: &ImageStream,
    tag: &str,
    score: f32,
    image: Option<ImageMetadata>,
) -> ComponentMatch {
    let full = format!("{}/{}", stream.namespace(), stream.name());
    let (name, argument, description) = if tag.is_empty() {
        (
            full.clone(),
            format!("--image-stream={:?} --allow-missing-imagestream-tags", full),
            format!(
                "Image stream {:?} in project {:?}",
                stream.name(),
                stream.namespace()
            ),
        )
    } else {
        let tagged = format!("{}:{}", full, tag);
        (
            tagged.clone(),
            format!("--image-stream={:?}", tagged),
            format!(
                "Image stream {:?} (tag {:?}) in project {:?}",
                stream.name(),
                tag,
                stream.namespace()
            ),
        )
    };
    ComponentMatch {
        value: term.to_string(),
        name,
        argument,
        description,
        score,
        image_tag: tag.to_string(),
        supports_direct_tagging: stream.metadata.generation > 0,
        payload: Some(MatchPayload::ImageStream {
            stream: Box::new(stream.clone()),
            image: image.map(Box::new),
        }),
        ..Default::default()
    }
}

/// Finds image streams by name across an ordered list of namespaces
pub struct ImageStreamSearcher {
    pub client: Rc<dyn ImageStreamClient>,
    pub namespaces: Vec<String>,
    pub allow_missing_tags: bool,
}

impl ImageStreamSearcher {
    /// Follows a spec tag that points at another tag of the same stream
    fn follow_tag(stream: &ImageStream, tag: &str) -> String {
        let followed = stream
            .spec_tag(tag)
            .and_then(|t| t.from.as_ref())
            .filter(|from| from.kind == "ImageStreamTag" && !from.name.contains(':'))
            .filter(|from| stream.latest_tagged_image(&from.name).is_some())
            .map(|from| from.name.clone());
        match followed {
            Some(target) => {
                trace!(stream = stream.name(), tag, target = %target, "following tag");
                target
            }
            None => tag.to_string(),
        }
    }

    fn search_stream(
        &self,
        term: &str,
        stream: &ImageStream,
        tag: &str,
        follow: bool,
        score: f32,
        results: &mut ComponentMatches,
    ) -> Result<(), ResolveError> {
        let tag = if follow {
            Self::follow_tag(stream, tag)
        } else {
            tag.to_string()
        };

        let Some(latest) = stream.latest_tagged_image(&tag) else {
            if self.allow_missing_tags {
                results.push(stream_match(term, stream, &tag, score, None));
                return Ok(());
            }
            let others: Vec<&str> = stream
                .status_tags()
                .filter(|t| *t != tag && stream.latest_tagged_image(t).is_some())
                .collect();
            if others.is_empty() {
                warn!(stream = stream.name(), namespace = stream.namespace(), "image stream has no tags with images");
                let mut m = stream_match(term, stream, "", score, None);
                m.no_tags_found = true;
                results.push(m);
            }
            for other in others {
                let other_score = if score == 0.0 { 0.5 } else { score };
                results.push(stream_match(term, stream, other, other_score, None));
            }
            return Ok(());
        };

        let image = match self
            .client
            .get_image_stream_image(stream.namespace(), stream.name(), &latest.image)
        {
            Ok(image) => image,
            Err(err) if err.is_not_found() => {
                debug!(stream = stream.name(), image = %latest.image, "image stream image not found");
                return Ok(());
            }
            Err(err) => return Err(ResolveError::lookup(term, err)),
        };
        results.push(stream_match(term, stream, &tag, score, Some(image)));
        Ok(())
    }
}

impl Searcher for ImageStreamSearcher {
    fn search(&self, precise: bool, terms: &[&str]) -> Result<ComponentMatches, ResolveError> {
        let mut results = ComponentMatches::new();
        for term in terms {
            let Some(reference) = stream_reference(term) else {
                continue;
            };
            let namespaces = if reference.namespace.is_empty() {
                self.namespaces.clone()
            } else {
                vec![reference.namespace.clone()]
            };
            let (tag, follow) = if reference.tag.is_empty() {
                (DEFAULT_IMAGE_TAG, true)
            } else {
                (reference.tag.as_str(), false)
            };

            for namespace in &namespaces {
                let streams = match self.client.list_image_streams(namespace) {
                    Ok(streams) => streams,
                    Err(err) if err.is_not_found_or_forbidden() => {
                        debug!(namespace, error = %err, "skipping namespace");
                        continue;
                    }
                    Err(err) => return Err(ResolveError::lookup(term, err)),
                };

                let mut term_matches = ComponentMatches::new();
                for stream in &streams {
                    let score = string_proximity_scorer(stream.name(), &reference.name);
                    if score >= SCORE_THRESHOLD {
                        continue;
                    }
                    self.search_stream(term, stream, tag, follow, score, &mut term_matches)?;
                }
                let exact = term_matches.iter().any(|m| m.exact());
                results.extend(term_matches);
                if precise && exact {
                    break;
                }
            }
        }
        Ok(results.sorted())
    }
}

/// Finds image stream tags whose `supports` annotation names the term.
///
/// Stream listings are memoized per namespace for the life of the searcher;
/// call [`reset`](Self::reset) or build a new searcher for each run.
pub struct ImageStreamByAnnotationSearcher {
    pub client: Rc<dyn ImageStreamClient>,
    pub namespaces: Vec<String>,
    cache: RefCell<HashMap<String, Rc<Vec<ImageStream>>>>,
}

impl ImageStreamByAnnotationSearcher {
    pub fn new(client: Rc<dyn ImageStreamClient>, namespaces: Vec<String>) -> Self {
        Self {
            client,
            namespaces,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn reset(&self) {
        self.cache.borrow_mut().clear();
    }

    fn streams(&self, namespace: &str) -> Result<Rc<Vec<ImageStream>>, crate::client::ClientError> {
        if let Some(streams) = self.cache.borrow().get(namespace) {
            return Ok(Rc::clone(streams));
        }
        let streams = Rc::new(self.client.list_image_streams(namespace)?);
        self.cache
            .borrow_mut()
            .insert(namespace.to_string(), Rc::clone(&streams));
        Ok(streams)
    }
}

impl Searcher for ImageStreamByAnnotationSearcher {
    fn search(&self, precise: bool, terms: &[&str]) -> Result<ComponentMatches, ResolveError> {
        let mut results = ComponentMatches::new();
        for namespace in &self.namespaces {
            let streams = match self.streams(namespace) {
                Ok(streams) => streams,
                Err(err) if err.is_not_found_or_forbidden() => {
                    debug!(namespace, error = %err, "skipping namespace");
                    continue;
                }
                Err(err) => return Err(ResolveError::lookup(&terms.join(","), err)),
            };

            for stream in streams.iter() {
                for term in terms {
                    for tag in &stream.spec.tags {
                        let Some(supports) = tag.annotations.get(SUPPORTS_ANNOTATION) else {
                            continue;
                        };
                        let Some(score) = match_supports_annotation(term, supports) else {
                            continue;
                        };
                        let Some(latest) = stream.latest_tagged_image(&tag.name) else {
                            debug!(stream = stream.name(), tag = %tag.name, "supported tag has no image");
                            continue;
                        };
                        let image = match self.client.get_image_stream_image(
                            namespace,
                            stream.name(),
                            &latest.image,
                        ) {
                            Ok(image) => image,
                            Err(err) if err.is_not_found() => {
                                debug!(stream = stream.name(), image = %latest.image, "tagged image not found");
                                continue;
                            }
                            Err(err) => return Err(ResolveError::lookup(term, err)),
                        };
                        trace!(term, stream = stream.name(), tag = %tag.name, score, "annotation match");
                        results.push(stream_match(term, stream, &tag.name, score, Some(image)));
                    }
                }
            }
            if precise && results.iter().any(|m| m.exact()) {
                break;
            }
        }
        Ok(results.sorted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ObjectMeta, ObjectReference, TagEvent, TagReference, NamedTagEventList};
    use crate::client::{Catalog, ClientError};
    use std::cell::Cell;
    use std::collections::BTreeMap;

    fn stream(namespace: &str, name: &str, tags: &[(&str, &str)]) -> ImageStream {
        let mut meta = ObjectMeta::named(name);
        meta.namespace = namespace.to_string();
        meta.generation = 1;
        let mut stream = ImageStream::new(meta);
        for (tag, image) in tags {
            stream.spec.tags.push(TagReference {
                name: tag.to_string(),
                ..Default::default()
            });
            stream.status.tags.push(NamedTagEventList {
                tag: tag.to_string(),
                items: vec![TagEvent {
                    image: image.to_string(),
                    ..Default::default()
                }],
            });
        }
        stream
    }

    fn image(id: &str) -> ImageMetadata {
        ImageMetadata {
            id: id.to_string(),
            ..Default::default()
        }
    }

    fn searcher(catalog: Catalog, namespaces: &[&str]) -> ImageStreamSearcher {
        ImageStreamSearcher {
            client: Rc::new(catalog),
            namespaces: namespaces.iter().map(|n| n.to_string()).collect(),
            allow_missing_tags: false,
        }
    }

    #[test]
    fn test_precise_search_stops_at_first_exact_namespace() {
        let catalog = Catalog::default()
            .with_image_stream(stream("myproject", "ruby", &[("latest", "sha256:a")]))
            .with_image_stream(stream("openshift", "ruby", &[("latest", "sha256:b")]))
            .with_image(image("sha256:a"))
            .with_image(image("sha256:b"));
        let searcher = searcher(catalog, &["myproject", "openshift"]);

        let precise = searcher.search(true, &["ruby"]).unwrap();
        assert_eq!(precise.len(), 1);
        let m = precise.first().unwrap();
        assert_eq!(m.name, "myproject/ruby:latest");
        assert_eq!(m.argument, "--image-stream=\"myproject/ruby:latest\"");
        assert!(m.supports_direct_tagging);
        assert_eq!(m.image().unwrap().id, "sha256:a");

        assert_eq!(searcher.search(false, &["ruby"]).unwrap().len(), 2);
    }

    #[test]
    fn test_follows_same_stream_tag() {
        let mut ruby = stream("openshift", "ruby", &[("2.5", "sha256:a")]);
        ruby.spec.tags.push(TagReference {
            name: "latest".to_string(),
            from: Some(ObjectReference {
                kind: "ImageStreamTag".to_string(),
                name: "2.5".to_string(),
                namespace: String::new(),
            }),
            ..Default::default()
        });
        let catalog = Catalog::default()
            .with_image_stream(ruby)
            .with_image(image("sha256:a"));

        let matches = searcher(catalog, &["openshift"]).search(true, &["ruby"]).unwrap();
        let m = matches.first().unwrap();
        assert_eq!(m.image_tag, "2.5");
        assert!(m.exact());
    }

    #[test]
    fn test_missing_tag_offers_other_tags() {
        let catalog = Catalog::default()
            .with_image_stream(stream("openshift", "ruby", &[("2.5", "sha256:a")]))
            .with_image_stream(stream("openshift", "rubyx", &[]))
            .with_image(image("sha256:a"));

        let matches = searcher(catalog, &["openshift"]).search(false, &["ruby"]).unwrap();
        let found: Vec<(String, f32, bool)> = matches
            .iter()
            .map(|m| (m.name.clone(), m.score, m.no_tags_found))
            .collect();
        assert_eq!(
            found,
            vec![
                ("openshift/rubyx".to_string(), 0.1, true),
                ("openshift/ruby:2.5".to_string(), 0.5, false),
            ]
        );
    }

    #[test]
    fn test_registry_references_are_ignored() {
        let catalog = Catalog::default().with_image_stream(stream("openshift", "ruby", &[]));
        assert!(searcher(catalog, &["openshift"])
            .search(true, &["quay.io/openshift/ruby"])
            .unwrap()
            .is_empty());
    }

    struct CountingClient {
        inner: Catalog,
        lists: Cell<usize>,
    }

    impl ImageStreamClient for CountingClient {
        fn list_image_streams(&self, namespace: &str) -> Result<Vec<ImageStream>, ClientError> {
            self.lists.set(self.lists.get() + 1);
            self.inner.list_image_streams(namespace)
        }

        fn get_image_stream(&self, namespace: &str, name: &str) -> Result<ImageStream, ClientError> {
            self.inner.get_image_stream(namespace, name)
        }

        fn get_image_stream_image(
            &self,
            namespace: &str,
            stream: &str,
            image_id: &str,
        ) -> Result<ImageMetadata, ClientError> {
            self.inner.get_image_stream_image(namespace, stream, image_id)
        }
    }

    #[test]
    fn test_annotation_search_caches_namespace_listings() {
        let mut ruby = stream("openshift", "ruby", &[("2.5", "sha256:a")]);
        ruby.spec.tags[0].annotations = BTreeMap::from([(
            SUPPORTS_ANNOTATION.to_string(),
            "ruby:2.5,ruby".to_string(),
        )]);
        let client = Rc::new(CountingClient {
            inner: Catalog::default()
                .with_image_stream(ruby)
                .with_image(image("sha256:a")),
            lists: Cell::new(0),
        });
        let searcher = ImageStreamByAnnotationSearcher::new(client.clone(), vec!["openshift".to_string()]);

        let matches = searcher.search(true, &["ruby"]).unwrap();
        let m = matches.first().unwrap();
        assert!(m.exact());
        assert_eq!(m.image_tag, "2.5");
        assert_eq!(searcher.search(true, &["ruby:2.7"]).unwrap().first().unwrap().score, 0.5);
        assert_eq!(client.lists.get(), 1);

        searcher.reset();
        searcher.search(true, &["python"]).unwrap();
        assert_eq!(client.lists.get(), 2);
    }

    struct UnreachableImages(Catalog);

    impl ImageStreamClient for UnreachableImages {
        fn list_image_streams(&self, namespace: &str) -> Result<Vec<ImageStream>, ClientError> {
            self.0.list_image_streams(namespace)
        }

        fn get_image_stream(&self, namespace: &str, name: &str) -> Result<ImageStream, ClientError> {
            self.0.get_image_stream(namespace, name)
        }

        fn get_image_stream_image(
            &self,
            _namespace: &str,
            _stream: &str,
            _image_id: &str,
        ) -> Result<ImageMetadata, ClientError> {
            Err(ClientError::Unavailable {
                service: "cluster".to_string(),
                message: "connection reset".to_string(),
            })
        }
    }

    #[test]
    fn test_annotation_search_propagates_client_failures() {
        let mut ruby = stream("openshift", "ruby", &[("2.5", "sha256:a")]);
        ruby.spec.tags[0].annotations =
            BTreeMap::from([(SUPPORTS_ANNOTATION.to_string(), "ruby".to_string())]);
        let client = Rc::new(UnreachableImages(Catalog::default().with_image_stream(ruby)));
        let searcher = ImageStreamByAnnotationSearcher::new(client, vec!["openshift".to_string()]);

        match searcher.search(true, &["ruby"]) {
            Err(ResolveError::Lookup { value, source }) => {
                assert_eq!(value, "ruby");
                assert!(source.to_string().contains("connection reset"));
            }
            other => panic!("expected lookup error, got {:?}", other),
        }
    }

    #[test]
    fn test_annotation_search_skips_missing_images() {
        let mut ruby = stream("openshift", "ruby", &[("2.5", "sha256:missing")]);
        ruby.spec.tags[0].annotations =
            BTreeMap::from([(SUPPORTS_ANNOTATION.to_string(), "ruby".to_string())]);
        let searcher = ImageStreamByAnnotationSearcher::new(
            Rc::new(Catalog::default().with_image_stream(ruby)),
            vec!["openshift".to_string()],
        );
        assert!(searcher.search(true, &["ruby"]).unwrap().is_empty());
    }
}
