use super::errors::ResolveError;
use super::matches::ComponentMatches;
use std::rc::Rc;

/// Returns zero or more scored candidates for the given terms.
///
/// Finding nothing is not an error; errors mean a collaborator failed.
/// With `precise` set, a searcher may stop early once it has exact matches.
pub trait Searcher {
    fn search(&self, precise: bool, terms: &[&str]) -> Result<ComponentMatches, ResolveError>;

    /// True when `value` names a file this searcher loads directly.
    ///
    /// Resolvers use this to prefer the searcher's own error over a bare
    /// "no match" for a file that failed to load.
    fn loads_file(&self, _value: &str) -> bool {
        false
    }
}

/// Searches every member and concatenates the results
#[derive(Clone, Default)]
pub struct MultiSimpleSearcher(pub Vec<Rc<dyn Searcher>>);

impl Searcher for MultiSimpleSearcher {
    fn search(&self, precise: bool, terms: &[&str]) -> Result<ComponentMatches, ResolveError> {
        let mut all = ComponentMatches::new();
        for searcher in &self.0 {
            all.extend(searcher.search(precise, terms)?);
        }
        Ok(all.sorted())
    }

    fn loads_file(&self, value: &str) -> bool {
        self.0.iter().any(|s| s.loads_file(value))
    }
}

/// A searcher whose scores are offset by a weight
#[derive(Clone)]
pub struct WeightedSearcher {
    pub searcher: Rc<dyn Searcher>,
    pub weight: f32,
}

/// Searches every member, adds its weight to each score and sorts.
///
/// Used for non-precise `--search` listings where every candidate is shown.
#[derive(Clone, Default)]
pub struct MultiWeightedSearcher(pub Vec<WeightedSearcher>);

impl Searcher for MultiWeightedSearcher {
    fn search(&self, precise: bool, terms: &[&str]) -> Result<ComponentMatches, ResolveError> {
        let mut all = ComponentMatches::new();
        for weighted in &self.0 {
            let mut matches = weighted.searcher.search(precise, terms)?;
            for m in matches.iter_mut() {
                m.score += weighted.weight;
            }
            all.extend(matches);
        }
        Ok(all.sorted())
    }
}
