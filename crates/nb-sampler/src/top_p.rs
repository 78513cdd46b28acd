use crate::candidate::{normalize, sort_descending, Candidate};
use crate::error::Result;
use crate::filter::{invalid, Filter};

/// Nucleus filtering: keeps the smallest prefix of candidates, by descending
/// probability, whose cumulative probability reaches the threshold `p`.
///
/// The candidate that crosses the threshold is kept. `p == 1` is a no-op.
#[derive(Debug, Clone)]
pub struct TopPFilter {
    p: f64,
}

impl TopPFilter {
    /// Fails with `InvalidConfig` unless `0 < p <= 1`.
    pub fn new(p: f64) -> Result<Self> {
        if !(p > 0.0 && p <= 1.0) {
            return Err(invalid(format!("top_p must be in (0, 1], got {}", p)));
        }
        Ok(Self { p })
    }
}

impl Filter for TopPFilter {
    fn name(&self) -> &str {
        "top_p"
    }

    fn apply(&self, candidates: &mut Vec<Candidate>) {
        if candidates.is_empty() || self.p >= 1.0 {
            return;
        }

        sort_descending(candidates);

        let mut cumulative = 0.0f64;
        let mut cutoff = candidates.len();
        for (i, c) in candidates.iter().enumerate() {
            cumulative += c.prob;
            if cumulative >= self.p {
                cutoff = i + 1;
                break;
            }
        }

        candidates.truncate(cutoff);
        normalize(candidates);
    }
}
