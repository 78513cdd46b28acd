use nb_model::{Lambdas, NgramModel, TokenId};
use nb_sampler::{greedy_pick, sample_index, Candidate, CandidateFilter};
use rand::Rng;
use tracing::debug;

use crate::error::{DecodeError, Result};

fn check_seed<S: AsRef<str>>(model: &NgramModel, seed: &[S], lambdas: &Lambdas) -> Result<()> {
    if seed.is_empty() {
        return Err(DecodeError::InvalidInput(
            "seed sequence must contain at least one token".to_string(),
        ));
    }
    if model.vocab().is_empty() {
        return Err(DecodeError::EmptyVocabulary);
    }
    lambdas.validate()?;
    Ok(())
}

/// Positive interpolated probabilities after `history`, in vocabulary order.
fn interpolated<S: AsRef<str>>(model: &NgramModel, history: &[S], lambdas: &Lambdas) -> Vec<Candidate> {
    let ctx = model.context(history);
    model
        .vocab()
        .iter()
        .map(|(id, _)| Candidate::new(id, ctx.probability(id, lambdas)))
        .filter(|c| c.prob > 0.0)
        .collect()
}

/// Normalized interpolated distribution over the vocabulary after `history`,
/// passed through `filter`. Tokens with zero probability are left out; an
/// empty result means nothing can follow.
pub fn distribution<S: AsRef<str>>(
    model: &NgramModel,
    history: &[S],
    lambdas: &Lambdas,
    filter: &CandidateFilter,
) -> Vec<Candidate> {
    filter.apply(interpolated(model, history, lambdas))
}

/// The most probable continuation of `history`, ties going to the earliest
/// token in vocabulary order. `None` when nothing has positive probability.
pub fn next_greedy<S: AsRef<str>>(
    model: &NgramModel,
    history: &[S],
    lambdas: &Lambdas,
) -> Option<TokenId> {
    greedy_pick(&interpolated(model, history, lambdas)).map(|c| c.token_id)
}

/// Append the greedy continuation until the sequence holds `target_len`
/// tokens or no continuation exists.
pub fn generate_greedy<S: AsRef<str>>(
    model: &NgramModel,
    seed: &[S],
    target_len: usize,
    lambdas: &Lambdas,
) -> Result<Vec<String>> {
    check_seed(model, seed, lambdas)?;
    let mut tokens: Vec<String> = seed.iter().map(|t| t.as_ref().to_string()).collect();

    while tokens.len() < target_len {
        let Some(token) = next_greedy(model, &tokens, lambdas).and_then(|id| model.vocab().token(id))
        else {
            debug!(len = tokens.len(), "greedy generation stopped early");
            break;
        };
        tokens.push(token.to_string());
    }
    Ok(tokens)
}

/// Append tokens drawn from the filtered distribution with `rng` until the
/// sequence holds `target_len` tokens or no continuation exists.
pub fn generate_sampled<S: AsRef<str>, R: Rng + ?Sized>(
    model: &NgramModel,
    seed: &[S],
    target_len: usize,
    lambdas: &Lambdas,
    filter: &CandidateFilter,
    rng: &mut R,
) -> Result<Vec<String>> {
    check_seed(model, seed, lambdas)?;
    let mut tokens: Vec<String> = seed.iter().map(|t| t.as_ref().to_string()).collect();

    while tokens.len() < target_len {
        let candidates = distribution(model, &tokens, lambdas, filter);
        let picked = sample_index(&candidates, rng)
            .and_then(|i| model.vocab().token(candidates[i].token_id));
        match picked {
            Some(token) => tokens.push(token.to_string()),
            None => {
                debug!(len = tokens.len(), "sampled generation stopped early");
                break;
            }
        }
    }
    Ok(tokens)
}
