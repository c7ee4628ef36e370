//! Resolution strategies
//!
//! Each resolver turns the candidates of one or more searchers into exactly
//! one match or a structured `NoMatch` / `MultipleMatches` error. Callers pick
//! the strategy per component kind.

use super::errors::ResolveError;
use super::matches::{ComponentMatch, ComponentMatches};
use super::search::Searcher;
use std::rc::Rc;
use tracing::{debug, trace};

/// Resolves a value to exactly one match
pub trait Resolver {
    fn resolve(&self, value: &str) -> Result<ComponentMatch, ResolveError>;
}

/// Takes the first match the searcher returns
pub struct FirstMatchResolver {
    pub searcher: Rc<dyn Searcher>,
}

impl Resolver for FirstMatchResolver {
    fn resolve(&self, value: &str) -> Result<ComponentMatch, ResolveError> {
        self.searcher
            .search(true, &[value])?
            .take_first()
            .ok_or_else(|| ResolveError::no_match(value))
    }
}

/// Takes the best scored match; ties go to the first one returned
pub struct HighestScoreResolver {
    pub searcher: Rc<dyn Searcher>,
}

impl Resolver for HighestScoreResolver {
    fn resolve(&self, value: &str) -> Result<ComponentMatch, ResolveError> {
        self.searcher
            .search(true, &[value])?
            .sorted()
            .take_first()
            .ok_or_else(|| ResolveError::no_match(value))
    }
}

/// Takes the best scored match, failing when the best two tie
pub struct HighestUniqueScoreResolver {
    pub searcher: Rc<dyn Searcher>,
}

impl Resolver for HighestUniqueScoreResolver {
    fn resolve(&self, value: &str) -> Result<ComponentMatch, ResolveError> {
        let matches = self.searcher.search(true, &[value])?.sorted();
        match (matches.get(0), matches.get(1)) {
            (None, _) => Err(ResolveError::no_match(value)),
            (Some(best), Some(next)) if best.score == next.score => {
                let top = best.score;
                let tied = matches.into_iter().filter(|m| m.score == top).collect();
                Err(ResolveError::MultipleMatches {
                    value: value.to_string(),
                    matches: tied,
                })
            }
            _ => matches
                .take_first()
                .ok_or_else(|| ResolveError::no_match(value)),
        }
    }
}

/// Prefers a single exact match, then a single inexact one
pub struct UniqueExactOrInexactMatchResolver {
    pub searcher: Rc<dyn Searcher>,
}

impl Resolver for UniqueExactOrInexactMatchResolver {
    fn resolve(&self, value: &str) -> Result<ComponentMatch, ResolveError> {
        let matches = self.searcher.search(true, &[value])?.sorted();
        let exact = matches.exact();
        let candidates = if exact.is_empty() { matches.inexact() } else { exact };
        match candidates.len() {
            0 => Err(ResolveError::no_match(value)),
            1 => candidates
                .take_first()
                .ok_or_else(|| ResolveError::no_match(value)),
            _ => Err(ResolveError::MultipleMatches {
                value: value.to_string(),
                matches: candidates,
            }),
        }
    }
}

/// A searcher with the weight its scores are multiplied by
#[derive(Clone)]
pub struct WeightedResolver {
    pub searcher: Rc<dyn Searcher>,
    pub weight: f32,
}

/// Searches runs of equal weight in order, returning as soon as a run has a
/// single perfect answer.
///
/// A run answers with its only exact match, or, without exact matches, its
/// best inexact match when that one is strictly better than the next. Runs
/// without such an answer contribute their weighted candidates to a pool that
/// is ranked once every run has been searched.
pub struct PerfectMatchWeightedResolver(pub Vec<WeightedResolver>);

impl PerfectMatchWeightedResolver {
    fn runs(&self) -> Vec<&[WeightedResolver]> {
        let mut runs = Vec::new();
        let mut start = 0;
        for i in 1..=self.0.len() {
            if i == self.0.len() || self.0[i].weight != self.0[start].weight {
                runs.push(&self.0[start..i]);
                start = i;
            }
        }
        runs
    }
}

impl Resolver for PerfectMatchWeightedResolver {
    fn resolve(&self, value: &str) -> Result<ComponentMatch, ResolveError> {
        let mut imperfect = ComponentMatches::new();
        let mut errors: Vec<(Rc<dyn Searcher>, ResolveError)> = Vec::new();

        for run in self.runs() {
            let weight = run[0].weight;
            let mut found = ComponentMatches::new();
            for member in run {
                match member.searcher.search(true, &[value]) {
                    Ok(matches) => found.extend(matches),
                    Err(err) => {
                        debug!(value, error = %err, "searcher failed");
                        errors.push((Rc::clone(&member.searcher), err));
                    }
                }
            }
            found.sort();

            let exact = found.exact();
            let no_exact = exact.is_empty();
            if exact.len() == 1 {
                trace!(value, weight, "unique exact match");
                return exact
                    .take_first()
                    .ok_or_else(|| ResolveError::no_match(value));
            }
            if no_exact {
                let inexact = found.inexact();
                let unique = match (inexact.get(0), inexact.get(1)) {
                    (Some(_), None) => true,
                    (Some(best), Some(next)) => best.score < next.score,
                    _ => false,
                };
                if unique {
                    trace!(value, weight, "unique inexact match");
                    if let Some(m) = inexact.take_first() {
                        return Ok(m);
                    }
                }
            }

            for mut m in found {
                if weight != 0.0 {
                    m.score *= weight;
                }
                imperfect.push(m);
            }
        }

        match imperfect.len() {
            0 => {
                if let Some(pos) = errors.iter().position(|(s, _)| s.loads_file(value)) {
                    return Err(errors.swap_remove(pos).1);
                }
                let qualifier = (!errors.is_empty()).then(|| {
                    errors
                        .iter()
                        .map(|(_, err)| err.to_string())
                        .collect::<Vec<_>>()
                        .join("; ")
                });
                Err(ResolveError::NoMatch {
                    value: value.to_string(),
                    qualifier,
                })
            }
            1 => imperfect
                .take_first()
                .ok_or_else(|| ResolveError::no_match(value)),
            _ => {
                imperfect.sort();
                let unique = match (imperfect.get(0), imperfect.get(1)) {
                    (Some(best), Some(next)) => best.score < next.score,
                    _ => false,
                };
                if unique {
                    return imperfect
                        .take_first()
                        .ok_or_else(|| ResolveError::no_match(value));
                }
                Err(ResolveError::MultipleMatches {
                    value: value.to_string(),
                    matches: imperfect,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::search::testing::StaticSearcher;
    use crate::client::ClientError;

    fn weighted(searcher: Rc<dyn Searcher>, weight: f32) -> WeightedResolver {
        WeightedResolver { searcher, weight }
    }

    #[test]
    fn test_equal_weight_exact_matches_are_pooled() {
        let resolver = PerfectMatchWeightedResolver(vec![
            weighted(StaticSearcher::with_scores("a", &[0.0, 0.0]), 0.0),
            weighted(StaticSearcher::with_scores("b", &[0.0, 0.0, 0.0]), 0.0),
        ]);

        match resolver.resolve("ruby") {
            Err(ResolveError::MultipleMatches { value, matches }) => {
                assert_eq!(value, "ruby");
                assert_eq!(matches.len(), 5);
            }
            other => panic!("expected multiple matches, got {:?}", other),
        }
    }

    #[test]
    fn test_unique_exact_match_short_circuits_later_runs() {
        let resolver = PerfectMatchWeightedResolver(vec![
            weighted(StaticSearcher::with_scores("stream", &[0.0, 0.1]), 0.0),
            weighted(
                StaticSearcher::failing(|| ResolveError::no_match("unreachable")),
                2.0,
            ),
        ]);

        let m = resolver.resolve("ruby").unwrap();
        assert_eq!(m.name, "stream-0");
    }

    #[test]
    fn test_unique_inexact_match_short_circuits() {
        let resolver = PerfectMatchWeightedResolver(vec![
            weighted(StaticSearcher::with_scores("stream", &[0.2, 0.1]), 0.0),
            weighted(StaticSearcher::with_scores("docker", &[0.0]), 2.0),
        ]);

        let m = resolver.resolve("ruby").unwrap();
        assert_eq!(m.name, "stream-1");
    }

    #[test]
    fn test_weight_biases_pooled_candidates() {
        let resolver = PerfectMatchWeightedResolver(vec![
            weighted(StaticSearcher::with_scores("stream", &[0.1, 0.1]), 0.0),
            weighted(StaticSearcher::with_scores("docker", &[0.5, 0.5]), 2.0),
        ]);

        match resolver.resolve("ruby") {
            Err(ResolveError::MultipleMatches { matches, .. }) => {
                let scores: Vec<f32> = matches.iter().map(|m| m.score).collect();
                assert_eq!(scores, vec![0.1, 0.1, 1.0, 1.0]);
            }
            other => panic!("expected multiple matches, got {:?}", other),
        }
    }

    #[test]
    fn test_single_pooled_candidate_is_returned() {
        let resolver = PerfectMatchWeightedResolver(vec![
            weighted(StaticSearcher::with_scores("stream", &[0.0, 0.0]), 0.0),
        ]);
        assert!(resolver.resolve("ruby").is_err());

        let resolver = PerfectMatchWeightedResolver(vec![
            weighted(StaticSearcher::with_scores("empty", &[]), 0.0),
            weighted(StaticSearcher::with_scores("docker", &[0.5]), 2.0),
        ]);
        let m = resolver.resolve("ruby").unwrap();
        assert_eq!(m.name, "docker-0");
    }

    #[test]
    fn test_file_searcher_error_wins_over_no_match() {
        let failing: Rc<dyn Searcher> = Rc::new(StaticSearcher {
            matches: Vec::new(),
            error: Some(|| ResolveError::TemplateFile {
                path: "tpl.json".to_string(),
                message: "object in \"tpl.json\" is not a template".to_string(),
            }),
            file: Some("tpl.json".to_string()),
        });
        let other: Rc<dyn Searcher> =
            StaticSearcher::failing(|| ResolveError::no_match("tpl.json"));
        let resolver = PerfectMatchWeightedResolver(vec![
            weighted(other, 0.0),
            weighted(failing, 0.0),
        ]);

        match resolver.resolve("tpl.json") {
            Err(ResolveError::TemplateFile { message, .. }) => {
                assert!(message.contains("not a template"))
            }
            other => panic!("expected template file error, got {:?}", other),
        }
    }

    #[test]
    fn test_no_candidates_is_no_match() {
        let resolver = PerfectMatchWeightedResolver(vec![weighted(
            StaticSearcher::with_scores("x", &[]),
            0.0,
        )]);
        assert!(resolver.resolve("ruby").unwrap_err().is_no_match());
    }

    #[test]
    fn test_failed_searcher_without_candidates_is_no_match() {
        let resolver = PerfectMatchWeightedResolver(vec![
            weighted(StaticSearcher::with_scores("stream", &[]), 0.0),
            weighted(
                StaticSearcher::failing(|| {
                    ResolveError::lookup(
                        "ruby",
                        ClientError::Unavailable {
                            service: "docker".to_string(),
                            message: "down".to_string(),
                        },
                    )
                }),
                2.0,
            ),
        ]);

        match resolver.resolve("ruby") {
            Err(ResolveError::NoMatch { value, qualifier }) => {
                assert_eq!(value, "ruby");
                assert!(qualifier.unwrap().contains("down"));
            }
            other => panic!("expected no match, got {:?}", other),
        }
    }

    #[test]
    fn test_highest_unique_score_rejects_ties() {
        let resolver = HighestUniqueScoreResolver {
            searcher: StaticSearcher::with_scores("t", &[0.1, 0.1, 0.2]),
        };
        match resolver.resolve("tpl") {
            Err(ResolveError::MultipleMatches { matches, .. }) => assert_eq!(matches.len(), 2),
            other => panic!("expected multiple matches, got {:?}", other),
        }

        let resolver = HighestUniqueScoreResolver {
            searcher: StaticSearcher::with_scores("t", &[0.2, 0.1]),
        };
        assert_eq!(resolver.resolve("tpl").unwrap().name, "t-1");
    }

    #[test]
    fn test_highest_score_takes_best() {
        let resolver = HighestScoreResolver {
            searcher: StaticSearcher::with_scores("s", &[0.2, 0.1, 0.1]),
        };
        assert_eq!(resolver.resolve("ruby").unwrap().name, "s-1");
    }

    #[test]
    fn test_unique_exact_or_inexact() {
        let resolver = UniqueExactOrInexactMatchResolver {
            searcher: StaticSearcher::with_scores("d", &[0.5, 0.0]),
        };
        assert_eq!(resolver.resolve("ruby").unwrap().name, "d-1");

        let resolver = UniqueExactOrInexactMatchResolver {
            searcher: StaticSearcher::with_scores("d", &[0.5, 0.25]),
        };
        match resolver.resolve("ruby") {
            Err(ResolveError::MultipleMatches { matches, .. }) => assert_eq!(matches.len(), 2),
            other => panic!("expected multiple matches, got {:?}", other),
        }
    }

    #[test]
    fn test_first_match() {
        let resolver = FirstMatchResolver {
            searcher: StaticSearcher::with_scores("f", &[0.4, 0.0]),
        };
        assert_eq!(resolver.resolve("x").unwrap().name, "f-0");

        let resolver = FirstMatchResolver {
            searcher: StaticSearcher::with_scores("f", &[]),
        };
        assert!(resolver.resolve("x").unwrap_err().is_no_match());
    }
}
