use crate::error::{ModelError, Result};
use crate::ngram::{ContextCounts, NgramModel};
use crate::tokenizer::vocab::TokenId;

/// Interpolation weights for the unigram, bigram and trigram estimates.
///
/// The weights are used exactly as given. The interpolated value is a proper
/// probability only when they sum to 1; keeping them normalized is the
/// caller's job (see [`Lambdas::is_normalized`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lambdas {
    pub unigram: f64,
    pub bigram: f64,
    pub trigram: f64,
}

impl Default for Lambdas {
    fn default() -> Self {
        Self {
            unigram: 0.2,
            bigram: 0.3,
            trigram: 0.5,
        }
    }
}

impl Lambdas {
    pub fn new(unigram: f64, bigram: f64, trigram: f64) -> Self {
        Self {
            unigram,
            bigram,
            trigram,
        }
    }

    /// Reject negative or non-finite weights.
    pub fn validate(&self) -> Result<()> {
        for (name, w) in [
            ("unigram", self.unigram),
            ("bigram", self.bigram),
            ("trigram", self.trigram),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(ModelError::InvalidConfig(format!(
                    "{} lambda must be finite and >= 0, got {}",
                    name, w
                )));
            }
        }
        Ok(())
    }

    pub fn sum(&self) -> f64 {
        self.unigram + self.bigram + self.trigram
    }

    /// True when the weights sum to 1 within `1e-9`.
    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() < 1e-9
    }
}

/// A resolved conditioning context: the bigram and trigram rows that apply to
/// the last one and two tokens of a history.
///
/// Resolving once per history avoids repeating the string lookups for every
/// vocabulary entry scored against it.
#[derive(Debug, Clone, Copy)]
pub struct ContextView<'a> {
    model: &'a NgramModel,
    bigram: Option<&'a ContextCounts>,
    trigram: Option<&'a ContextCounts>,
}

impl<'a> ContextView<'a> {
    /// Interpolated probability of `candidate` following this context:
    /// `trigram * pTri + bigram * pBi + unigram * pUni`.
    ///
    /// Each term is zero when its context is missing or the continuation was
    /// never observed after it.
    pub fn probability(&self, candidate: TokenId, lambdas: &Lambdas) -> f64 {
        let p_tri = self.trigram.map_or(0.0, |row| row.probability(candidate));
        let p_bi = self.bigram.map_or(0.0, |row| row.probability(candidate));
        let p_uni = self.model.unigram_probability(candidate);
        lambdas.trigram * p_tri + lambdas.bigram * p_bi + lambdas.unigram * p_uni
    }

    pub fn has_bigram(&self) -> bool {
        self.bigram.is_some()
    }

    pub fn has_trigram(&self) -> bool {
        self.trigram.is_some()
    }
}

impl NgramModel {
    /// Resolve the context formed by the last two (or fewer) tokens of
    /// `history`. Tokens unknown to the model simply leave the matching row
    /// unresolved.
    pub fn context<S: AsRef<str>>(&self, history: &[S]) -> ContextView<'_> {
        let vocab = self.vocab();
        let last = history.last().and_then(|t| vocab.id(t.as_ref()));
        let bigram = last.and_then(|id| self.bigram_id(id));

        let trigram = if history.len() >= 2 {
            let prev = vocab.id(history[history.len() - 2].as_ref());
            match (prev, last) {
                (Some(a), Some(b)) => self.trigram_id(a, b),
                _ => None,
            }
        } else {
            None
        };

        ContextView {
            model: self,
            bigram,
            trigram,
        }
    }

    /// Interpolated probability of `candidate` after `history`. Unknown
    /// candidates have probability 0.
    pub fn probability<S: AsRef<str>>(
        &self,
        history: &[S],
        candidate: &str,
        lambdas: &Lambdas,
    ) -> f64 {
        match self.vocab().id(candidate) {
            Some(id) => self.context(history).probability(id, lambdas),
            None => 0.0,
        }
    }
}
