use super::errors::ResolveError;
use super::matches::{ComponentMatch, ComponentMatches};
use super::resolvers::Resolver;
use super::search::Searcher;
use super::source::RepositoryId;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

const S2I_SCRIPTS_LABELS: &[&str] = &["io.openshift.s2i.scripts-url", "io.s2i.scripts-url"];
const S2I_SCRIPTS_ENV: &str = "STI_SCRIPTS_URL=";

/// Index of a component inside its [`ReferenceBuilder`](super::ReferenceBuilder)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub usize);

/// One user requested component and the strategy used to resolve it
#[derive(Clone)]
pub struct ComponentInput {
    pub group_id: usize,
    /// The argument as the user wrote it
    pub from: String,
    pub argument: String,
    pub value: String,
    pub expect_to_build: bool,
    pub resolved_match: Option<ComponentMatch>,
    pub search_matches: ComponentMatches,
    pub resolver: Option<Rc<dyn Resolver>>,
    pub searcher: Option<Rc<dyn Searcher>>,
    uses: Option<RepositoryId>,
}

impl ComponentInput {
    pub fn new(value: &str) -> Self {
        Self {
            group_id: 0,
            from: value.to_string(),
            argument: value.to_string(),
            value: value.to_string(),
            expect_to_build: false,
            resolved_match: None,
            search_matches: ComponentMatches::new(),
            resolver: None,
            searcher: None,
            uses: None,
        }
    }

    /// The source repository this component builds, if paired
    pub fn uses(&self) -> Option<RepositoryId> {
        self.uses
    }

    pub(crate) fn set_uses(&mut self, repository: RepositoryId) {
        self.uses = Some(repository);
    }

    pub fn needs_source(&self) -> bool {
        self.expect_to_build && self.uses.is_none()
    }

    /// Resolves the value to one match, adopting its value and argument
    pub fn resolve(&mut self) -> Result<(), ResolveError> {
        let resolver = self.resolver.clone().ok_or_else(|| ResolveError::NoMatch {
            value: self.value.clone(),
            qualifier: Some("no resolver defined".to_string()),
        })?;
        let m = resolver.resolve(&self.value)?;
        debug!(value = %self.value, matched = %m.name, score = m.score, "resolved component");
        self.value = m.value.clone();
        self.argument = m.argument.clone();
        self.resolved_match = Some(m);
        Ok(())
    }

    /// Records every candidate for the value without choosing one
    pub fn search(&mut self) -> Result<(), ResolveError> {
        let searcher = self.searcher.clone().ok_or_else(|| ResolveError::NoMatch {
            value: self.value.clone(),
            qualifier: Some("no searcher defined".to_string()),
        })?;
        self.search_matches = searcher.search(false, &[self.value.as_str()])?;
        Ok(())
    }
}

impl fmt::Display for ComponentInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.from)
    }
}

impl fmt::Debug for ComponentInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInput")
            .field("group_id", &self.group_id)
            .field("value", &self.value)
            .field("expect_to_build", &self.expect_to_build)
            .field("uses", &self.uses)
            .field("resolved", &self.resolved_match.as_ref().map(|m| &m.name))
            .finish()
    }
}

/// Whether a match is an image that knows how to build source
pub fn is_builder_match(m: &ComponentMatch) -> bool {
    if let Some(image) = m.image() {
        if S2I_SCRIPTS_LABELS
            .iter()
            .any(|label| image.config.labels.contains_key(*label))
        {
            return true;
        }
        if image
            .config
            .env
            .iter()
            .any(|env| env.starts_with(S2I_SCRIPTS_ENV))
        {
            return true;
        }
    }
    if let Some(stream) = m.image_stream() {
        let tag = if m.image_tag.is_empty() {
            crate::api::DEFAULT_IMAGE_TAG
        } else {
            m.image_tag.as_str()
        };
        if let Some(tags) = stream.spec_tag(tag).and_then(|t| t.annotations.get("tags")) {
            return tags.split(',').any(|t| t.trim() == "builder");
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ImageMetadata, ImageStream, ObjectMeta, TagReference};
    use crate::app::matches::MatchPayload;
    use crate::app::resolvers::FirstMatchResolver;
    use crate::app::search::testing::StaticSearcher;
    use std::collections::BTreeMap;

    #[test]
    fn test_needs_source() {
        let mut input = ComponentInput::new("ruby");
        assert!(!input.needs_source());
        input.expect_to_build = true;
        assert!(input.needs_source());
        input.set_uses(RepositoryId(0));
        assert!(!input.needs_source());
    }

    #[test]
    fn test_resolve_adopts_match() {
        let mut input = ComponentInput::new("ruby");
        assert!(input.resolve().unwrap_err().to_string().contains("no resolver defined"));

        input.resolver = Some(Rc::new(FirstMatchResolver {
            searcher: StaticSearcher::with_scores("ruby", &[0.0]),
        }));
        input.resolve().unwrap();
        assert_eq!(input.value, "ruby-0");
        assert_eq!(input.argument, "--ruby=0");
        assert_eq!(input.from, "ruby");
        assert!(input.resolved_match.is_some());
    }

    #[test]
    fn test_builder_detection() {
        let mut image = ImageMetadata::default();
        image
            .config
            .labels
            .insert("io.openshift.s2i.scripts-url".to_string(), "image:///usr/libexec/s2i".to_string());
        let m = ComponentMatch {
            payload: Some(MatchPayload::Image(Box::new(image))),
            ..Default::default()
        };
        assert!(is_builder_match(&m));

        let mut image = ImageMetadata::default();
        image.config.env.push("STI_SCRIPTS_URL=image:///s2i".to_string());
        let m = ComponentMatch {
            payload: Some(MatchPayload::Image(Box::new(image))),
            ..Default::default()
        };
        assert!(is_builder_match(&m));

        let mut stream = ImageStream::new(ObjectMeta::named("ruby"));
        stream.spec.tags.push(TagReference {
            name: "2.5".to_string(),
            annotations: BTreeMap::from([("tags".to_string(), "builder, ruby".to_string())]),
            ..Default::default()
        });
        let m = ComponentMatch {
            image_tag: "2.5".to_string(),
            payload: Some(MatchPayload::ImageStream {
                stream: Box::new(stream),
                image: None,
            }),
            ..Default::default()
        };
        assert!(is_builder_match(&m));

        assert!(!is_builder_match(&ComponentMatch::default()));
    }
}
