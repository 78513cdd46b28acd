/// A next-token option considered during a single expansion step.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub token_id: u32,
    /// Probability-domain value. Filters read, truncate and renormalize this.
    pub prob: f64,
    /// Working score carried through filtering untouched.
    pub score: f64,
}

impl Candidate {
    pub fn new(token_id: u32, prob: f64) -> Self {
        Self {
            token_id,
            prob,
            score: 0.0,
        }
    }

    pub fn with_score(token_id: u32, prob: f64, score: f64) -> Self {
        Self {
            token_id,
            prob,
            score,
        }
    }
}

/// Sum of `prob` over the set.
pub fn total_prob(candidates: &[Candidate]) -> f64 {
    candidates.iter().map(|c| c.prob).sum()
}

/// Drop zero or non-finite probabilities and rescale the rest to sum to 1.
///
/// If no positive mass remains the set is cleared.
pub fn normalize(candidates: &mut Vec<Candidate>) {
    candidates.retain(|c| c.prob.is_finite() && c.prob > 0.0);
    let sum = total_prob(candidates);
    if !sum.is_finite() || sum <= 0.0 {
        candidates.clear();
        return;
    }
    for c in candidates.iter_mut() {
        c.prob /= sum;
    }
}

/// Stable sort, highest probability first. Equal probabilities keep their
/// current relative order.
pub fn sort_descending(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.prob.total_cmp(&a.prob));
}

/// Set each `prob` to the softmax of the working scores.
///
/// Candidates whose score is `-inf` receive probability 0 and are dropped by
/// the normalization.
pub fn softmax_scores(candidates: &mut Vec<Candidate>) {
    let max = candidates
        .iter()
        .map(|c| c.score)
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        candidates.clear();
        return;
    }
    for c in candidates.iter_mut() {
        c.prob = (c.score - max).exp();
    }
    normalize(candidates);
}
