use std::collections::HashMap;

use nb_model::NgramModel;
use nb_sampler::candidate::softmax_scores;
use nb_sampler::{Candidate, CandidateFilter, Penalty};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::beam::Beam;
use crate::cancellation::CancellationToken;
use crate::config::{DecodeConfig, ScoringMode};
use crate::error::{DecodeError, Result};

/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The best beam reached the target length (or the seed already had).
    TargetReached,
    /// A step produced no viable continuation for any beam.
    Exhausted,
    /// The cancellation token fired between steps.
    Cancelled,
}

/// Result of a beam search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Beams of the last step that had survivors, best first. These are the
    /// seed beams when no step succeeded.
    pub beams: Vec<Beam>,
    /// Number of steps that produced at least one beam.
    pub steps: usize,
    pub stop: StopReason,
}

impl SearchOutcome {
    pub fn best(&self) -> Option<&Beam> {
        self.beams.first()
    }

    /// Tokens of the best beam. Empty when the very first step already had
    /// no viable continuation.
    pub fn tokens(&self) -> Vec<String> {
        if self.steps == 0 && self.stop == StopReason::Exhausted {
            return Vec::new();
        }
        self.best().map(|b| b.tokens.clone()).unwrap_or_default()
    }
}

/// Beam search over an `NgramModel`.
///
/// Every step expands each live beam against the whole vocabulary, applies
/// repetition and diversity penalties, runs the candidate filter, pools the
/// extensions of all beams and keeps the best `beam_width`. Beams are
/// expanded in parallel; the pool is assembled in beam order and sorted
/// stably, so results do not depend on thread scheduling.
pub struct BeamSearchDecoder<'m> {
    model: &'m NgramModel,
    config: DecodeConfig,
    filter: CandidateFilter,
    repetition: Penalty,
    diversity: Penalty,
}

impl<'m> BeamSearchDecoder<'m> {
    /// Validate `config` against `model`. All configuration errors surface
    /// here, before any decoding work.
    pub fn new(model: &'m NgramModel, config: DecodeConfig) -> Result<Self> {
        config.validate()?;
        if model.vocab().is_empty() {
            return Err(DecodeError::EmptyVocabulary);
        }

        // Log-domain scoring already divides by the temperature.
        let filter_temperature = match config.scoring {
            ScoringMode::LogProb => 1.0,
            ScoringMode::Probability => config.temperature,
        };
        let filter = CandidateFilter::new(filter_temperature, config.top_k, config.top_p)?;
        let repetition = Penalty::new(config.repetition_penalty)?;
        let diversity = Penalty::new(config.diversity_alpha)?;

        Ok(Self {
            model,
            config,
            filter,
            repetition,
            diversity,
        })
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decode from a single seed until the sequence holds `target_len`
    /// tokens (seed included) or no beam can continue.
    pub fn decode<S: AsRef<str>>(&self, seed: &[S], target_len: usize) -> Result<Vec<String>> {
        let seed: Vec<String> = seed.iter().map(|t| t.as_ref().to_string()).collect();
        let outcome = self.search(&[seed], target_len, &CancellationToken::never())?;
        Ok(outcome.tokens())
    }

    /// Run the search from one or more seed sequences.
    ///
    /// Each seed starts a beam with score 0; if there are more seeds than
    /// `beam_width` the extras are dropped. `cancel` is checked once before
    /// every step.
    pub fn search(
        &self,
        seeds: &[Vec<String>],
        target_len: usize,
        cancel: &CancellationToken,
    ) -> Result<SearchOutcome> {
        if seeds.is_empty() {
            return Err(DecodeError::InvalidInput(
                "at least one seed sequence is required".to_string(),
            ));
        }
        let mut beams = seeds
            .iter()
            .map(|s| Beam::new(s.clone()))
            .collect::<Result<Vec<_>>>()?;
        beams.truncate(self.config.beam_width);

        debug!(
            seeds = beams.len(),
            target_len,
            beam_width = self.config.beam_width,
            scoring = ?self.config.scoring,
            "starting beam search"
        );

        let mut steps = 0usize;
        let stop = loop {
            let longest = beams.iter().map(Beam::len).max().unwrap_or(0);
            if longest >= target_len {
                break StopReason::TargetReached;
            }
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            let next = self.step(&beams);
            if next.is_empty() {
                break StopReason::Exhausted;
            }
            beams = next;
            steps += 1;
            trace!(step = steps, beams = beams.len(), best = beams[0].score, "step complete");
        };

        debug!(?stop, steps, "beam search finished");
        Ok(SearchOutcome { beams, steps, stop })
    }

    /// Expand every beam, pool the extensions and keep the best
    /// `beam_width`. Returns an empty set when no beam can continue.
    fn step(&self, beams: &[Beam]) -> Vec<Beam> {
        let mut last_words: HashMap<&str, usize> = HashMap::new();
        for beam in beams {
            *last_words.entry(beam.last()).or_insert(0) += 1;
        }

        let expansions: Vec<Vec<Beam>> = beams
            .par_iter()
            .map(|beam| self.expand(beam, &last_words))
            .collect();

        let mut pool: Vec<Beam> = expansions.into_iter().flatten().collect();
        pool.sort_by(|a, b| b.score.total_cmp(&a.score));
        pool.truncate(self.config.beam_width);
        pool
    }

    /// All surviving one-token extensions of `beam`, in filtered order.
    fn expand(&self, beam: &Beam, last_words: &HashMap<&str, usize>) -> Vec<Beam> {
        let survivors = self.candidates(beam, last_words);
        if survivors.is_empty() {
            debug!(len = beam.len(), last = beam.last(), "beam has no viable continuation");
            return Vec::new();
        }

        let vocab = self.model.vocab();
        survivors
            .into_iter()
            .filter_map(|c| {
                let token = vocab.token(c.token_id)?;
                let increment = match self.config.scoring {
                    ScoringMode::LogProb => c.score,
                    ScoringMode::Probability => c.prob.ln(),
                };
                Some(beam.extend(token, increment, self.config.length_normalization))
            })
            .collect()
    }

    /// Score, penalize and filter the vocabulary as continuations of `beam`.
    ///
    /// Penalties stay in log space in both scoring modes and candidates only
    /// become probabilities through a softmax shifted by the best score, so
    /// a long run of penalties lowers a candidate without zeroing it.
    pub(crate) fn candidates(
        &self,
        beam: &Beam,
        last_words: &HashMap<&str, usize>,
    ) -> Vec<Candidate> {
        let ctx = self.model.context(&beam.tokens);
        let lambdas = &self.config.lambdas;

        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        for token in &beam.tokens {
            *occurrences.entry(token.as_str()).or_insert(0) += 1;
        }
        let own_last = beam.last();

        // (candidate with its penalties in `score`, ln p)
        let mut scored: Vec<(Candidate, f64)> = Vec::new();
        for (id, token) in self.model.vocab().iter() {
            let p = ctx.probability(id, lambdas);
            if p <= 0.0 {
                continue;
            }

            let mut c = Candidate::with_score(id, 0.0, 0.0);
            let repeats = occurrences.get(token).copied().unwrap_or(0);
            self.repetition.apply(&mut c, repeats);

            // Other beams only: this beam's own last token does not count.
            let ending_here = last_words.get(token).copied().unwrap_or(0);
            let others = ending_here.saturating_sub(usize::from(token == own_last));
            self.diversity.apply(&mut c, others);

            scored.push((c, p.ln()));
        }
        if scored.is_empty() {
            return Vec::new();
        }

        // Log-domain scoring divides by the temperature here; probability
        // scoring leaves it to the filter.
        let scale = match self.config.scoring {
            ScoringMode::LogProb => self.config.temperature,
            ScoringMode::Probability => 1.0,
        };
        let max_log = scored
            .iter()
            .map(|(_, log_p)| *log_p)
            .fold(f64::NEG_INFINITY, f64::max);
        let mut candidates: Vec<Candidate> = scored
            .into_iter()
            .map(|(mut c, log_p)| {
                c.score += (log_p - max_log) / scale;
                c
            })
            .collect();
        softmax_scores(&mut candidates);

        // Undo the shift so `score` is the working score `ln p / T - penalties`.
        let offset = max_log / scale;
        for c in candidates.iter_mut() {
            c.score += offset;
        }
        self.filter.apply(candidates)
    }
}

/// Validate, build a decoder and decode from `seed` in one call.
pub fn decode<S: AsRef<str>>(
    model: &NgramModel,
    seed: &[S],
    target_len: usize,
    config: DecodeConfig,
) -> Result<Vec<String>> {
    BeamSearchDecoder::new(model, config)?.decode(seed, target_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nb_model::Lambdas;

    fn model() -> NgramModel {
        NgramModel::from_text("a b a c a b a c").unwrap()
    }

    fn bigram_only() -> DecodeConfig {
        DecodeConfig::default().with_lambdas(Lambdas::new(0.0, 1.0, 0.0))
    }

    fn beam(tokens: &[&str]) -> Beam {
        Beam::new(tokens.iter().map(|t| t.to_string()).collect()).unwrap()
    }

    fn seeds(list: &[&[&str]]) -> Vec<Vec<String>> {
        list.iter()
            .map(|s| s.iter().map(|t| t.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_greedy_bigram_scenario() {
        let m = model();
        let out = decode(&m, &["a"], 4, bigram_only().with_beam_width(1)).unwrap();
        assert_eq!(out, vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let m = model();
        for config in [
            DecodeConfig::default().with_temperature(0.0),
            DecodeConfig::default().with_beam_width(0),
            DecodeConfig::default().with_top_p(1.5),
            DecodeConfig::default().with_top_k(0),
        ] {
            assert!(matches!(
                BeamSearchDecoder::new(&m, config),
                Err(DecodeError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_empty_seed_rejected() {
        let m = model();
        let d = BeamSearchDecoder::new(&m, DecodeConfig::default()).unwrap();
        let empty: [&str; 0] = [];
        assert!(matches!(d.decode(&empty, 4), Err(DecodeError::InvalidInput(_))));
        assert!(matches!(
            d.search(&[], 4, &CancellationToken::never()),
            Err(DecodeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_seed_already_long_enough() {
        let m = model();
        let d = BeamSearchDecoder::new(&m, DecodeConfig::default()).unwrap();
        let outcome = d
            .search(&seeds(&[&["a", "b", "a"]]), 2, &CancellationToken::never())
            .unwrap();
        assert_eq!(outcome.stop, StopReason::TargetReached);
        assert_eq!(outcome.steps, 0);
        assert_eq!(outcome.tokens(), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_dead_first_step_returns_empty() {
        // Bigram-only: "c" at the end of the corpus has no continuation.
        let m = NgramModel::from_text("a b c").unwrap();
        let d = BeamSearchDecoder::new(&m, bigram_only()).unwrap();
        let outcome = d
            .search(&seeds(&[&["c"]]), 5, &CancellationToken::never())
            .unwrap();
        assert_eq!(outcome.stop, StopReason::Exhausted);
        assert!(outcome.tokens().is_empty());
    }

    #[test]
    fn test_exhaustion_keeps_last_survivors() {
        let m = NgramModel::from_text("a b c").unwrap();
        let d = BeamSearchDecoder::new(&m, bigram_only()).unwrap();
        let outcome = d
            .search(&seeds(&[&["a"]]), 10, &CancellationToken::never())
            .unwrap();
        assert_eq!(outcome.stop, StopReason::Exhausted);
        assert_eq!(outcome.steps, 2);
        assert_eq!(outcome.tokens(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cancelled_before_first_step() {
        let m = model();
        let d = BeamSearchDecoder::new(&m, DecodeConfig::default()).unwrap();
        let outcome = d
            .search(&seeds(&[&["a"]]), 10, &CancellationToken::already_cancelled())
            .unwrap();
        assert_eq!(outcome.stop, StopReason::Cancelled);
        assert_eq!(outcome.steps, 0);
        assert_eq!(outcome.tokens(), vec!["a"]);
    }

    #[test]
    fn test_beam_width_bounds_pool() {
        let m = NgramModel::from_text("the cat sat on the mat and the dog sat on the rug").unwrap();
        for width in 1..5 {
            let d = BeamSearchDecoder::new(&m, DecodeConfig::default().with_beam_width(width))
                .unwrap();
            let outcome = d
                .search(&seeds(&[&["the"]]), 6, &CancellationToken::never())
                .unwrap();
            assert!(outcome.beams.len() <= width);
            assert_eq!(outcome.best().unwrap().len(), 6);
            for pair in outcome.beams.windows(2) {
                assert!(pair[0].score >= pair[1].score);
            }
        }
    }

    #[test]
    fn test_extra_seeds_truncated_to_width() {
        let m = model();
        let d = BeamSearchDecoder::new(&m, bigram_only().with_beam_width(2)).unwrap();
        let outcome = d
            .search(&seeds(&[&["a"], &["b"], &["c"]]), 1, &CancellationToken::never())
            .unwrap();
        assert_eq!(outcome.beams.len(), 2);
        assert_eq!(outcome.beams[1].tokens, vec!["b"]);
    }

    #[test]
    fn test_log_scores_are_temperature_scaled() {
        let m = model();
        let d = BeamSearchDecoder::new(&m, bigram_only().with_beam_width(1).with_temperature(0.5))
            .unwrap();
        let outcome = d
            .search(&seeds(&[&["b"]]), 2, &CancellationToken::never())
            .unwrap();
        // p(a | b) = 1 -> ln 1 / 0.5 = 0
        assert_relative_eq!(outcome.best().unwrap().raw_score, 0.0);

        let outcome = d
            .search(&seeds(&[&["a"]]), 2, &CancellationToken::never())
            .unwrap();
        assert_relative_eq!(outcome.best().unwrap().raw_score, 0.5f64.ln() / 0.5);
    }

    #[test]
    fn test_repetition_penalty_lowers_score() {
        let m = model();
        let config = bigram_only().with_repetition_penalty(0.7);
        let d = BeamSearchDecoder::new(&m, config).unwrap();
        let plain = BeamSearchDecoder::new(&m, bigram_only()).unwrap();

        // "b" already appears twice in this beam, "c" never does.
        let b = beam(&["b", "x", "b", "a"]);
        let no_last: HashMap<&str, usize> = HashMap::new();
        let penalized = d.candidates(&b, &no_last);
        let baseline = plain.candidates(&b, &no_last);

        let score = |cands: &[Candidate], t: &str| {
            let id = m.vocab().id(t).unwrap();
            cands.iter().find(|c| c.token_id == id).unwrap().score
        };
        assert_relative_eq!(score(&baseline, "b"), score(&baseline, "c"));
        assert_relative_eq!(score(&penalized, "b"), score(&baseline, "b") - 1.4);
        assert_relative_eq!(score(&penalized, "c"), score(&baseline, "c"));
        assert!(score(&penalized, "b") < score(&penalized, "c"));
    }

    #[test]
    fn test_diversity_counts_other_beams_only() {
        let m = model();
        let d = BeamSearchDecoder::new(&m, DecodeConfig::default().with_diversity_alpha(0.5))
            .unwrap();
        let plain = BeamSearchDecoder::new(&m, DecodeConfig::default()).unwrap();

        let first = beam(&["c", "a"]);
        let second = beam(&["b", "a"]);
        let mut last_words: HashMap<&str, usize> = HashMap::new();
        last_words.insert("a", 2);

        let a = m.vocab().id("a").unwrap();
        let score_of = |dec: &BeamSearchDecoder<'_>, bm: &Beam| {
            dec.candidates(bm, &last_words)
                .into_iter()
                .find(|c| c.token_id == a)
                .unwrap()
                .score
        };
        // One other beam ends in "a" from either beam's point of view.
        assert_relative_eq!(score_of(&d, &first), score_of(&plain, &first) - 0.5);
        assert_relative_eq!(score_of(&d, &second), score_of(&plain, &second) - 0.5);

        // Alone in the set: no diversity penalty.
        let mut alone: HashMap<&str, usize> = HashMap::new();
        alone.insert("a", 1);
        let solo = d
            .candidates(&first, &alone)
            .into_iter()
            .find(|c| c.token_id == a)
            .unwrap()
            .score;
        assert_relative_eq!(solo, score_of(&plain, &first));
    }

    fn prob_of(m: &NgramModel, cands: &[Candidate], token: &str) -> f64 {
        let id = m.vocab().id(token).unwrap();
        cands.iter().find(|c| c.token_id == id).unwrap().prob
    }

    #[test]
    fn test_probability_mode_repetition_scales_mass() {
        let m = model();
        let config = bigram_only().with_scoring(ScoringMode::Probability);
        let d = BeamSearchDecoder::new(&m, config.clone().with_repetition_penalty(0.7)).unwrap();
        let plain = BeamSearchDecoder::new(&m, config).unwrap();

        let b = beam(&["b", "x", "b", "a"]);
        let no_last: HashMap<&str, usize> = HashMap::new();
        let baseline = plain.candidates(&b, &no_last);
        let penalized = d.candidates(&b, &no_last);

        assert_relative_eq!(prob_of(&m, &baseline, "b"), 0.5);
        assert_relative_eq!(prob_of(&m, &baseline, "c"), 0.5);
        // Two prior "b"s: its mass shrinks by exp(-1.4) relative to "c".
        let ratio = prob_of(&m, &penalized, "b") / prob_of(&m, &penalized, "c");
        assert_relative_eq!(ratio, (-1.4f64).exp(), epsilon = 1e-12);
        let total: f64 = penalized.iter().map(|c| c.prob).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_probability_mode_diversity_counts_other_beams_only() {
        let m = model();
        let config = DecodeConfig::default().with_scoring(ScoringMode::Probability);
        let d = BeamSearchDecoder::new(&m, config.clone().with_diversity_alpha(0.5)).unwrap();
        let plain = BeamSearchDecoder::new(&m, config).unwrap();

        let first = beam(&["c", "a"]);
        let mut last_words: HashMap<&str, usize> = HashMap::new();
        last_words.insert("a", 2);
        let ratio = |dec: &BeamSearchDecoder<'_>, words: &HashMap<&str, usize>| {
            let cands = dec.candidates(&first, words);
            prob_of(&m, &cands, "a") / prob_of(&m, &cands, "b")
        };

        let base = ratio(&plain, &last_words);
        assert_relative_eq!(ratio(&d, &last_words), base * (-0.5f64).exp(), epsilon = 1e-12);

        let mut alone: HashMap<&str, usize> = HashMap::new();
        alone.insert("a", 1);
        assert_relative_eq!(ratio(&d, &alone), base, epsilon = 1e-12);
    }

    #[test]
    fn test_long_repetitive_decode_reaches_target_in_both_modes() {
        // Past ~745 repeats a multiplied-out exp(-w * n) would be exactly 0.
        let m = NgramModel::from_text("a b a b a b").unwrap();
        for scoring in [ScoringMode::LogProb, ScoringMode::Probability] {
            let config = DecodeConfig::default()
                .with_beam_width(1)
                .with_lambdas(Lambdas::new(1.0, 0.0, 0.0))
                .with_repetition_penalty(1.0)
                .with_scoring(scoring);
            let d = BeamSearchDecoder::new(&m, config).unwrap();
            let outcome = d
                .search(&seeds(&[&["a"]]), 2000, &CancellationToken::never())
                .unwrap();
            assert_eq!(outcome.stop, StopReason::TargetReached, "{:?}", scoring);
            assert_eq!(outcome.steps, 1999);
            assert_eq!(outcome.tokens().len(), 2000);
        }
    }

    #[test]
    fn test_subnormal_temperature_still_decodes() {
        let m = model();
        for scoring in [ScoringMode::LogProb, ScoringMode::Probability] {
            let config = bigram_only()
                .with_beam_width(1)
                .with_temperature(1e-309)
                .with_scoring(scoring);
            let out = decode(&m, &["a"], 4, config).unwrap();
            assert_eq!(out, vec!["a", "b", "a", "b"], "{:?}", scoring);
        }
    }

    #[test]
    fn test_length_normalized_scores_use_raw_sum() {
        let m = model();
        let d = BeamSearchDecoder::new(
            &m,
            bigram_only().with_beam_width(1).with_length_normalization(true),
        )
        .unwrap();
        let outcome = d
            .search(&seeds(&[&["a"]]), 4, &CancellationToken::never())
            .unwrap();
        let best = outcome.best().unwrap();
        // a -> b (ln .5), b -> a (ln 1), a -> b (ln .5)
        let raw = 2.0 * 0.5f64.ln();
        assert_relative_eq!(best.raw_score, raw);
        assert_relative_eq!(best.score, raw / 4.0);
    }

    #[test]
    fn test_probability_mode_scenario() {
        let m = model();
        let config = bigram_only()
            .with_beam_width(1)
            .with_scoring(ScoringMode::Probability);
        let out = decode(&m, &["a"], 4, config).unwrap();
        assert_eq!(out, vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn test_probability_mode_accumulates_filtered_log_probs() {
        let m = model();
        let config = bigram_only()
            .with_beam_width(1)
            .with_top_k(1)
            .with_scoring(ScoringMode::Probability);
        let d = BeamSearchDecoder::new(&m, config).unwrap();
        let outcome = d
            .search(&seeds(&[&["a"]]), 3, &CancellationToken::never())
            .unwrap();
        // top_k = 1 renormalizes the survivor to probability 1 every step.
        assert_relative_eq!(outcome.best().unwrap().raw_score, 0.0);
        assert_eq!(outcome.tokens(), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_unknown_seed_token_falls_back_to_unigrams() {
        let m = model();
        let out = decode(&m, &["zebra"], 2, DecodeConfig::default().with_beam_width(1)).unwrap();
        // Unigram mass is highest for "a".
        assert_eq!(out, vec!["zebra", "a"]);
    }
}
