use crate::error::{DecodeError, Result};

/// One hypothesis in the beam set.
///
/// `raw_score` is the plain cumulative log score. `score` is what pruning
/// ranks by: `raw_score` itself, or `raw_score / tokens.len()` under length
/// normalization. The normalized value is always recomputed from
/// `raw_score`, never from a previous normalized score.
#[derive(Debug, Clone, PartialEq)]
pub struct Beam {
    pub tokens: Vec<String>,
    pub raw_score: f64,
    pub score: f64,
}

impl Beam {
    /// A starting beam with score 0 (log 1). Fails on an empty sequence.
    pub fn new(tokens: Vec<String>) -> Result<Self> {
        if tokens.is_empty() {
            return Err(DecodeError::InvalidInput(
                "seed sequence must contain at least one token".to_string(),
            ));
        }
        Ok(Self {
            tokens,
            raw_score: 0.0,
            score: 0.0,
        })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn last(&self) -> &str {
        self.tokens.last().map(String::as_str).unwrap_or("")
    }

    /// A new beam with `token` appended and `increment` added to the raw
    /// cumulative score.
    pub fn extend(&self, token: &str, increment: f64, length_normalization: bool) -> Beam {
        let mut tokens = Vec::with_capacity(self.tokens.len() + 1);
        tokens.extend(self.tokens.iter().cloned());
        tokens.push(token.to_string());

        let raw_score = self.raw_score + increment;
        let score = if length_normalization {
            raw_score / tokens.len() as f64
        } else {
            raw_score
        };

        Beam {
            tokens,
            raw_score,
            score,
        }
    }
}
