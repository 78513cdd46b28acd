use crate::candidate::{normalize, sort_descending, Candidate};
use crate::filter::Filter;

/// Keeps only the top K candidates by probability, discarding the rest.
#[derive(Debug, Clone)]
pub struct TopKFilter {
    k: usize,
}

impl TopKFilter {
    /// Create a new top-K filter that retains the `k` most probable candidates.
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl Filter for TopKFilter {
    fn name(&self) -> &str {
        "top_k"
    }

    fn apply(&self, candidates: &mut Vec<Candidate>) {
        if self.k == 0 {
            candidates.clear();
            return;
        }
        if self.k >= candidates.len() {
            return;
        }

        sort_descending(candidates);
        candidates.truncate(self.k);
        normalize(candidates);
    }
}
