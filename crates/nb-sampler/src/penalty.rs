use crate::candidate::Candidate;
use crate::error::Result;
use crate::filter::invalid;

/// A per-occurrence score reduction, used for both the repetition penalty
/// (occurrences of the candidate in the sequence being extended) and the
/// diversity penalty (other live beams already ending in the candidate).
///
/// The reduction is applied to the working log score: subtracting `w * n`
/// there is multiplying the probability by `exp(-w * n)` once the scores are
/// turned back into a distribution. Keeping it as an offset means a large
/// accumulated penalty lowers a candidate without underflowing it to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penalty {
    weight: f64,
}

impl Penalty {
    /// Fails with `InvalidConfig` for negative or non-finite weights.
    pub fn new(weight: f64) -> Result<Self> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(invalid(format!(
                "penalty must be finite and >= 0, got {}",
                weight
            )));
        }
        Ok(Self { weight })
    }

    pub fn none() -> Self {
        Self { weight: 0.0 }
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn is_active(&self) -> bool {
        self.weight > 0.0
    }

    /// Total reduction for `count` occurrences.
    pub fn amount(&self, count: usize) -> f64 {
        self.weight * count as f64
    }

    /// Subtract the reduction for `count` occurrences from `candidate.score`.
    pub fn apply(&self, candidate: &mut Candidate, count: usize) {
        if count == 0 || !self.is_active() {
            return;
        }
        candidate.score -= self.amount(count);
    }
}

impl Default for Penalty {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_negative() {
        assert!(Penalty::new(-0.1).is_err());
        assert!(Penalty::new(f64::NAN).is_err());
        assert!(Penalty::new(0.0).is_ok());
    }

    #[test]
    fn test_subtracts_per_occurrence() {
        let p = Penalty::new(0.5).unwrap();
        let mut c = Candidate::with_score(0, 0.4, -1.0);
        p.apply(&mut c, 3);
        assert_relative_eq!(c.score, -2.5);
        assert_relative_eq!(c.prob, 0.4);
    }

    #[test]
    fn test_large_penalty_stays_finite() {
        let p = Penalty::new(1.0).unwrap();
        let mut c = Candidate::with_score(0, 0.0, -0.7);
        p.apply(&mut c, 5_000);
        assert!(c.score.is_finite());
        assert_relative_eq!(c.score, -5_000.7);
    }

    #[test]
    fn test_zero_count_or_weight_is_noop() {
        let mut c = Candidate::with_score(0, 0.4, -1.0);
        Penalty::new(0.5).unwrap().apply(&mut c, 0);
        Penalty::none().apply(&mut c, 4);
        assert_eq!(c, Candidate::with_score(0, 0.4, -1.0));
        assert_eq!(Penalty::none().amount(4), 0.0);
    }
}
