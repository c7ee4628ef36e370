use crate::api::{ImageMetadata, ImageStream, Template};
use std::fmt;

/// What a match resolved to
#[derive(Debug, Clone, PartialEq)]
pub enum MatchPayload {
    /// A Docker image known to a daemon or registry
    Image(Box<ImageMetadata>),
    /// An image stream, with the metadata of the image its tag points at
    ImageStream {
        stream: Box<ImageStream>,
        image: Option<Box<ImageMetadata>>,
    },
    Template(Box<Template>),
}

/// One candidate answer to a resolution query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentMatch {
    /// The canonical matched string
    pub value: String,
    /// Flag form that re-selects this match, e.g. `--image-stream="openshift/ruby:2.5"`
    pub argument: String,
    pub name: String,
    pub description: String,
    /// Lower is better; `0.0` means exact
    pub score: f32,

    pub insecure: bool,
    pub local_only: bool,
    pub no_tags_found: bool,
    /// Synthesized without a lookup (the image is expected to exist at build time)
    pub is_virtual: bool,

    pub payload: Option<MatchPayload>,
    pub image_tag: String,

    /// Registry the image came from; empty for the default registry
    pub registry: Option<String>,
    /// The server can tag this image directly into an image stream
    pub supports_direct_tagging: bool,

    /// Set after resolution when the matched image is a source builder
    pub builder: bool,
}

impl ComponentMatch {
    pub fn exact(&self) -> bool {
        self.score == 0.0
    }

    pub fn image(&self) -> Option<&ImageMetadata> {
        match &self.payload {
            Some(MatchPayload::Image(image)) => Some(image.as_ref()),
            Some(MatchPayload::ImageStream { image, .. }) => image.as_deref(),
            _ => None,
        }
    }

    pub fn image_stream(&self) -> Option<&ImageStream> {
        match &self.payload {
            Some(MatchPayload::ImageStream { stream, .. }) => Some(stream.as_ref()),
            _ => None,
        }
    }

    pub fn template(&self) -> Option<&Template> {
        match &self.payload {
            Some(MatchPayload::Template(template)) => Some(template.as_ref()),
            _ => None,
        }
    }

    pub fn is_template(&self) -> bool {
        self.template().is_some()
    }

    pub fn is_image(&self) -> bool {
        !self.is_template()
    }
}

impl fmt::Display for ComponentMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argument)?;
        if !self.description.is_empty() {
            write!(f, "\n  {}", self.description)?;
        }
        Ok(())
    }
}

/// Matches kept sorted ascending by score
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentMatches(Vec<ComponentMatch>);

impl ComponentMatches {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, m: ComponentMatch) {
        self.0.push(m);
    }

    pub fn extend(&mut self, other: ComponentMatches) {
        self.0.extend(other.0);
    }

    /// Stable sort by score
    pub fn sort(&mut self) {
        self.0.sort_by(|a, b| a.score.total_cmp(&b.score));
    }

    pub fn sorted(mut self) -> Self {
        self.sort();
        self
    }

    pub fn exact(&self) -> ComponentMatches {
        self.0.iter().filter(|m| m.exact()).cloned().collect()
    }

    pub fn inexact(&self) -> ComponentMatches {
        self.0.iter().filter(|m| !m.exact()).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ComponentMatch> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ComponentMatch> {
        self.0.iter_mut()
    }

    pub fn first(&self) -> Option<&ComponentMatch> {
        self.0.first()
    }

    pub fn get(&self, index: usize) -> Option<&ComponentMatch> {
        self.0.get(index)
    }

    pub fn into_vec(self) -> Vec<ComponentMatch> {
        self.0
    }

    /// Removes and returns the first match
    pub fn take_first(self) -> Option<ComponentMatch> {
        self.0.into_iter().next()
    }
}

impl FromIterator<ComponentMatch> for ComponentMatches {
    fn from_iter<I: IntoIterator<Item = ComponentMatch>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<ComponentMatch>> for ComponentMatches {
    fn from(matches: Vec<ComponentMatch>) -> Self {
        Self(matches)
    }
}

impl IntoIterator for ComponentMatches {
    type Item = ComponentMatch;
    type IntoIter = std::vec::IntoIter<ComponentMatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ComponentMatches {
    type Item = &'a ComponentMatch;
    type IntoIter = std::slice::Iter<'a, ComponentMatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
