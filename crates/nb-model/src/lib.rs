//! `nb-model` - n-gram language model for ngram-beam.
//!
//! This crate provides:
//! - Whitespace tokenization and a first-seen-order `Vocab`
//! - `train`, which aggregates unigram/bigram/trigram count tables into an
//!   immutable `NgramModel`
//! - `Lambdas` and `ContextView` for interpolated next-token probabilities

pub mod error;
pub mod estimator;
pub mod ngram;
pub mod tokenizer;

pub use error::{ModelError, Result};
pub use estimator::{ContextView, Lambdas};
pub use ngram::{train, ContextCounts, NgramModel};
pub use tokenizer::vocab::{TokenId, Vocab};
pub use tokenizer::tokenize;
