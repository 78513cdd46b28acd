use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::candidate::Candidate;

/// The most probable candidate. Ties go to the earliest one in the slice.
pub fn greedy_pick(candidates: &[Candidate]) -> Option<&Candidate> {
    let mut best: Option<&Candidate> = None;
    for c in candidates {
        match best {
            Some(b) if c.prob <= b.prob => {}
            _ => best = Some(c),
        }
    }
    best
}

/// Draw an index from `candidates` weighted by `prob`, using the caller's
/// random source. Returns `None` for an empty set or unusable weights.
pub fn sample_index<R: Rng + ?Sized>(candidates: &[Candidate], rng: &mut R) -> Option<usize> {
    let dist = WeightedIndex::new(candidates.iter().map(|c| c.prob)).ok()?;
    Some(dist.sample(rng))
}
