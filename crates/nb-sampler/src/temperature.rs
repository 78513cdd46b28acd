use crate::candidate::{normalize, Candidate};
use crate::error::Result;
use crate::filter::{invalid, Filter};

/// Raises every probability to `1 / temperature` and renormalizes.
///
/// Temperatures below 1 sharpen the distribution, above 1 flatten it toward
/// uniform. The power is taken in log space relative to the largest
/// probability, so very small temperatures keep the leader at mass 1 instead
/// of underflowing the whole set to zero.
#[derive(Debug, Clone)]
pub struct TemperatureFilter {
    temperature: f64,
}

impl TemperatureFilter {
    /// Fails with `InvalidConfig` unless `temperature` is positive and finite.
    pub fn new(temperature: f64) -> Result<Self> {
        if !temperature.is_finite() || temperature <= 0.0 {
            return Err(invalid(format!(
                "temperature must be > 0, got {}",
                temperature
            )));
        }
        Ok(Self { temperature })
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

impl Filter for TemperatureFilter {
    fn name(&self) -> &str {
        "temperature"
    }

    fn apply(&self, candidates: &mut Vec<Candidate>) {
        normalize(candidates);
        if candidates.is_empty() || self.temperature == 1.0 {
            return;
        }

        let max_log = candidates
            .iter()
            .map(|c| c.prob.ln())
            .fold(f64::NEG_INFINITY, f64::max);
        for c in candidates.iter_mut() {
            c.prob = ((c.prob.ln() - max_log) / self.temperature).exp();
        }
        normalize(candidates);
    }
}
