//! `nb-decode` - decoding over an `NgramModel`.
//!
//! This crate provides:
//! - `BeamSearchDecoder`, which expands, penalizes, filters and prunes
//!   candidate sequences step by step
//! - `DecodeConfig` with the beam width, filter, penalty and scoring options
//! - Single-path greedy and seeded weighted-random generation
//! - A `CancellationToken` checked once per decoding step

pub mod beam;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod generate;
pub mod search;

pub use beam::Beam;
pub use cancellation::{CancellationHandle, CancellationToken};
pub use config::{DecodeConfig, ScoringMode};
pub use error::{DecodeError, Result};
pub use generate::{distribution, generate_greedy, generate_sampled, next_greedy};
pub use search::{decode, BeamSearchDecoder, SearchOutcome, StopReason};

pub use nb_model::{train, Lambdas, NgramModel};
