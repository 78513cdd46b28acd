use nb_model::Lambdas;

use crate::error::{DecodeError, Result};

/// How candidate scores are accumulated along a beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringMode {
    /// Working score is `ln(p) / temperature` minus additive penalties; a
    /// surviving candidate adds its working score to the beam. Filtering
    /// runs on the softmax of the working scores.
    #[default]
    LogProb,
    /// Working value is the probability scaled by multiplicative penalties;
    /// filtering applies the temperature, and a surviving candidate adds the
    /// log of its filtered, renormalized probability.
    Probability,
}

/// Parameters controlling beam-search decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeConfig {
    /// Beams retained after each step.
    pub beam_width: usize,
    pub temperature: f64,
    /// Keep only the k most probable candidates per beam per step.
    pub top_k: Option<usize>,
    /// Nucleus threshold in `(0, 1]`.
    pub top_p: Option<f64>,
    pub lambdas: Lambdas,
    /// Score reduction per occurrence of the candidate in the beam.
    pub repetition_penalty: f64,
    /// Score reduction per other live beam ending in the candidate.
    pub diversity_alpha: f64,
    /// Rank beams by cumulative score divided by sequence length.
    pub length_normalization: bool,
    pub scoring: ScoringMode,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            beam_width: 3,
            temperature: 1.0,
            top_k: None,
            top_p: None,
            lambdas: Lambdas::default(),
            repetition_penalty: 0.0,
            diversity_alpha: 0.0,
            length_normalization: false,
            scoring: ScoringMode::LogProb,
        }
    }
}

impl DecodeConfig {
    pub fn with_beam_width(mut self, beam_width: usize) -> Self {
        self.beam_width = beam_width;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_lambdas(mut self, lambdas: Lambdas) -> Self {
        self.lambdas = lambdas;
        self
    }

    pub fn with_repetition_penalty(mut self, penalty: f64) -> Self {
        self.repetition_penalty = penalty;
        self
    }

    pub fn with_diversity_alpha(mut self, alpha: f64) -> Self {
        self.diversity_alpha = alpha;
        self
    }

    pub fn with_length_normalization(mut self, enabled: bool) -> Self {
        self.length_normalization = enabled;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringMode) -> Self {
        self.scoring = scoring;
        self
    }

    /// Check every option before any decoding work starts.
    pub fn validate(&self) -> Result<()> {
        if self.beam_width == 0 {
            return Err(DecodeError::InvalidConfig(
                "beam_width must be > 0".to_string(),
            ));
        }
        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return Err(DecodeError::InvalidConfig(format!(
                "temperature must be > 0, got {}",
                self.temperature
            )));
        }
        if self.top_k == Some(0) {
            return Err(DecodeError::InvalidConfig("top_k must be > 0".to_string()));
        }
        if let Some(p) = self.top_p {
            if !(p > 0.0 && p <= 1.0) {
                return Err(DecodeError::InvalidConfig(format!(
                    "top_p must be in (0, 1], got {}",
                    p
                )));
            }
        }
        for (name, value) in [
            ("repetition_penalty", self.repetition_penalty),
            ("diversity_alpha", self.diversity_alpha),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DecodeError::InvalidConfig(format!(
                    "{} must be finite and >= 0, got {}",
                    name, value
                )));
            }
        }
        self.lambdas.validate()?;
        Ok(())
    }
}
