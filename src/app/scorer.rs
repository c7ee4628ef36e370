//! Scoring functions
//!
//! Scores are drawn from a small set of fixed constants so that exact
//! float comparisons (`score == 0.0`, equal-score ties) stay deterministic.
//! Lower is better; `0.0` is an exact match.

use crate::api::{DockerImageReference, DEFAULT_IMAGE_TAG};
use crate::client::LocalImage;

/// Scores below this are worth returning as candidates
pub const SCORE_THRESHOLD: f32 = 0.3;

/// Distance between a candidate string and a query
pub fn string_proximity_scorer(candidate: &str, query: &str) -> f32 {
    if candidate == query || query == "*" {
        return 0.0;
    }
    let lower_candidate = candidate.to_lowercase();
    let lower_query = query.to_lowercase();
    if lower_candidate == lower_query {
        return 0.02;
    }
    if candidate.starts_with(query) {
        return 0.1;
    }
    if lower_candidate.starts_with(&lower_query) {
        return 0.12;
    }
    if candidate.contains(query) {
        return 0.2;
    }
    if lower_candidate.contains(&lower_query) {
        return 0.22;
    }
    1.0
}

/// Compares two optional fields.
///
/// Returns whether the fields are compatible and the score they contribute:
/// one side empty or a prefix relation (when allowed) costs `partial`, equal
/// values cost nothing, anything else is incompatible and costs `none`.
pub fn partial_scorer(a: &str, b: &str, allow_prefix: bool, partial: f32, none: f32) -> (bool, f32) {
    match (a.is_empty(), b.is_empty()) {
        (true, false) | (false, true) => (true, partial),
        _ if a == b => (true, 0.0),
        _ if allow_prefix && (a.starts_with(b) || b.starts_with(a)) => (true, partial),
        _ => (false, none),
    }
}

/// A local repo tag that matched a query, with its normalized score
#[derive(Debug, Clone, PartialEq)]
pub struct TagMatch {
    pub value: String,
    pub score: f32,
}

/// Matches the repo tags of a local image against a parsed query.
///
/// `value` is the raw query (with a default tag appended when the query had
/// none); a repo tag equal to it is exact. Otherwise name (prefix allowed),
/// namespace, registry and tag each add up to 1.0; tags
/// with an incompatible name or a total of 4.0 are dropped and the rest are
/// normalized into `[0, 1)`.
pub fn match_tag(image: &LocalImage, value: &str, query: &DockerImageReference) -> Vec<TagMatch> {
    let mut matches = Vec::new();
    for repo_tag in &image.repo_tags {
        if repo_tag == value {
            matches.push(TagMatch {
                value: repo_tag.clone(),
                score: 0.0,
            });
            continue;
        }
        let mut candidate = match DockerImageReference::parse(repo_tag) {
            Ok(r) => r,
            Err(_) => continue,
        };
        if candidate.tag.is_empty() {
            candidate.tag = DEFAULT_IMAGE_TAG.to_string();
        }

        let (ok, name_score) = partial_scorer(&query.name, &candidate.name, true, 0.5, 1.0);
        if !ok {
            continue;
        }
        let (_, namespace_score) =
            partial_scorer(&query.namespace, &candidate.namespace, false, 0.5, 1.0);
        let (_, registry_score) =
            partial_scorer(&query.registry, &candidate.registry, false, 0.5, 1.0);
        let (_, tag_score) = partial_scorer(&query.tag, &candidate.tag, false, 0.5, 1.0);

        let score = name_score + namespace_score + registry_score + tag_score;
        if score >= 4.0 {
            continue;
        }
        matches.push(TagMatch {
            value: repo_tag.clone(),
            score: score / 4.0,
        });
    }
    matches
}

/// Matches a term against a comma separated `supports` annotation.
///
/// An exact entry scores 0.0; an entry whose base (before `:`) equals the
/// term's base scores 0.5.
pub fn match_supports_annotation(value: &str, annotation: &str) -> Option<f32> {
    let entries: Vec<&str> = annotation
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect();
    if entries.iter().any(|e| *e == value) {
        return Some(0.0);
    }
    let base = |s: &str| s.split(':').next().unwrap_or_default().to_string();
    let value_base = base(value);
    if entries.iter().any(|e| base(e) == value_base) {
        return Some(0.5);
    }
    None
}
