use std::collections::HashMap;

use tracing::debug;

use crate::error::{ModelError, Result};
use crate::tokenizer::tokenize;
use crate::tokenizer::vocab::{TokenId, Vocab};

/// Continuation counts observed after one context (a bigram or trigram row).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextCounts {
    counts: HashMap<TokenId, u64>,
    total: u64,
}

impl ContextCounts {
    fn increment(&mut self, next: TokenId) {
        *self.counts.entry(next).or_insert(0) += 1;
        self.total += 1;
    }

    /// Times `next` followed this context. Zero if never observed.
    pub fn count(&self, next: TokenId) -> u64 {
        self.counts.get(&next).copied().unwrap_or(0)
    }

    /// Sum of all continuation counts for this context.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Maximum-likelihood estimate `count(next) / total`.
    pub fn probability(&self, next: TokenId) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(next) as f64 / self.total as f64
    }

    /// Number of distinct continuations.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate over `(next, count)` pairs. Order is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = (TokenId, u64)> + '_ {
        self.counts.iter().map(|(&id, &c)| (id, c))
    }
}

/// Immutable unigram/bigram/trigram count tables over a corpus.
///
/// Contexts are keyed by token ids (`TokenId` for bigrams, a
/// `(TokenId, TokenId)` tuple for trigrams), so tokens containing spaces or
/// any other separator can never collide with a different context.
#[derive(Debug, Clone, PartialEq)]
pub struct NgramModel {
    vocab: Vocab,
    /// Unigram counts, indexed by token ID. Every entry is at least 1.
    unigrams: Vec<u64>,
    total: u64,
    bigrams: HashMap<TokenId, ContextCounts>,
    trigrams: HashMap<(TokenId, TokenId), ContextCounts>,
}

/// Build an `NgramModel` from an ordered token sequence.
///
/// For each position `i` the unigram count of `tokens[i]` is incremented,
/// along with the bigram `tokens[i] -> tokens[i+1]` and the trigram
/// `(tokens[i], tokens[i+1]) -> tokens[i+2]` when those positions exist.
///
/// Fails with `ModelError::InvalidInput` when `tokens` is empty.
pub fn train<S: AsRef<str>>(tokens: &[S]) -> Result<NgramModel> {
    if tokens.is_empty() {
        return Err(ModelError::InvalidInput(
            "training requires at least one token".to_string(),
        ));
    }

    let mut vocab = Vocab::new();
    let ids = tokens
        .iter()
        .map(|t| vocab.intern(t.as_ref()))
        .collect::<Result<Vec<TokenId>>>()?;

    let mut unigrams = vec![0u64; vocab.len()];
    let mut bigrams: HashMap<TokenId, ContextCounts> = HashMap::new();
    let mut trigrams: HashMap<(TokenId, TokenId), ContextCounts> = HashMap::new();

    for (i, &id) in ids.iter().enumerate() {
        unigrams[id as usize] += 1;
        if let Some(&next) = ids.get(i + 1) {
            bigrams.entry(id).or_default().increment(next);
            if let Some(&after) = ids.get(i + 2) {
                trigrams.entry((id, next)).or_default().increment(after);
            }
        }
    }

    debug!(
        tokens = ids.len(),
        vocab = vocab.len(),
        bigram_contexts = bigrams.len(),
        trigram_contexts = trigrams.len(),
        "trained n-gram model"
    );

    Ok(NgramModel {
        vocab,
        unigrams,
        total: ids.len() as u64,
        bigrams,
        trigrams,
    })
}

impl NgramModel {
    /// Tokenize `text` on whitespace and train on the result.
    pub fn from_text(text: &str) -> Result<NgramModel> {
        train(&tokenize(text))
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    /// Total number of training tokens (the sum of all unigram counts).
    pub fn total_tokens(&self) -> u64 {
        self.total
    }

    pub fn unigram_count(&self, token: &str) -> u64 {
        self.vocab
            .id(token)
            .map(|id| self.unigram_count_id(id))
            .unwrap_or(0)
    }

    pub fn unigram_count_id(&self, id: TokenId) -> u64 {
        self.unigrams.get(id as usize).copied().unwrap_or(0)
    }

    /// `count(token) / total_tokens`, or 0 for an unknown id.
    pub fn unigram_probability(&self, id: TokenId) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.unigram_count_id(id) as f64 / self.total as f64
    }

    /// Continuations observed after the single token `prev`.
    pub fn bigram(&self, prev: &str) -> Option<&ContextCounts> {
        self.vocab.id(prev).and_then(|id| self.bigram_id(id))
    }

    pub fn bigram_id(&self, prev: TokenId) -> Option<&ContextCounts> {
        self.bigrams.get(&prev)
    }

    pub fn bigram_count(&self, prev: &str, next: &str) -> u64 {
        match (self.bigram(prev), self.vocab.id(next)) {
            (Some(row), Some(next)) => row.count(next),
            _ => 0,
        }
    }

    /// Continuations observed after the pair `(first, second)`.
    pub fn trigram(&self, first: &str, second: &str) -> Option<&ContextCounts> {
        let first = self.vocab.id(first)?;
        let second = self.vocab.id(second)?;
        self.trigram_id(first, second)
    }

    pub fn trigram_id(&self, first: TokenId, second: TokenId) -> Option<&ContextCounts> {
        self.trigrams.get(&(first, second))
    }

    pub fn trigram_count(&self, first: &str, second: &str, next: &str) -> u64 {
        match (self.trigram(first, second), self.vocab.id(next)) {
            (Some(row), Some(next)) => row.count(next),
            _ => 0,
        }
    }

    /// Iterate over every bigram context and its row.
    pub fn bigram_contexts(&self) -> impl Iterator<Item = (TokenId, &ContextCounts)> + '_ {
        self.bigrams.iter().map(|(&id, row)| (id, row))
    }

    /// Iterate over every trigram context pair and its row.
    pub fn trigram_contexts(
        &self,
    ) -> impl Iterator<Item = ((TokenId, TokenId), &ContextCounts)> + '_ {
        self.trigrams.iter().map(|(&key, row)| (key, row))
    }
}
