use crate::candidate::{normalize, Candidate};
use crate::error::{Result, SamplerError};
use crate::temperature::TemperatureFilter;
use crate::top_k::TopKFilter;
use crate::top_p::TopPFilter;

/// A transform over a normalized candidate set.
///
/// Implementations may rescale, reorder or drop candidates, and must leave
/// the surviving probabilities summing to 1 (or the set empty).
pub trait Filter: Send + Sync {
    /// Returns the name of this filter.
    fn name(&self) -> &str;

    /// Modify candidates in-place.
    fn apply(&self, candidates: &mut Vec<Candidate>);
}

/// Composes multiple filters into a pipeline applied in insertion order.
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    /// Create a new empty filter chain.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the end of the chain. Returns self for builder-style usage.
    pub fn with(mut self, filter: Box<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Names of the filters in application order.
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run every filter in order. An emptied set short-circuits the rest.
    pub fn apply(&self, candidates: &mut Vec<Candidate>) {
        for filter in &self.filters {
            if candidates.is_empty() {
                return;
            }
            filter.apply(candidates);
        }
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated temperature, top-k and top-p pipeline.
///
/// Temperature always runs first, then top-k, then top-p; each step
/// renormalizes what it keeps. An empty output means there is no viable
/// continuation.
pub struct CandidateFilter {
    temperature: f64,
    top_k: Option<usize>,
    top_p: Option<f64>,
    chain: FilterChain,
}

impl CandidateFilter {
    /// Build the pipeline, failing with `InvalidConfig` when `temperature`
    /// is not a positive finite number or `top_p` lies outside `(0, 1]`.
    ///
    /// `top_k == Some(0)` is accepted here and empties every set.
    pub fn new(temperature: f64, top_k: Option<usize>, top_p: Option<f64>) -> Result<Self> {
        let mut chain = FilterChain::new().with(Box::new(TemperatureFilter::new(temperature)?));
        if let Some(k) = top_k {
            chain = chain.with(Box::new(TopKFilter::new(k)));
        }
        if let Some(p) = top_p {
            chain = chain.with(Box::new(TopPFilter::new(p)?));
        }
        Ok(Self {
            temperature,
            top_k,
            top_p,
            chain,
        })
    }

    /// A pipeline that only renormalizes.
    pub fn identity() -> Self {
        Self {
            temperature: 1.0,
            top_k: None,
            top_p: None,
            chain: FilterChain::new(),
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn top_k(&self) -> Option<usize> {
        self.top_k
    }

    pub fn top_p(&self) -> Option<f64> {
        self.top_p
    }

    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }

    /// Normalize `candidates`, then run the pipeline.
    pub fn apply(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        normalize(&mut candidates);
        self.chain.apply(&mut candidates);
        candidates
    }
}

impl std::fmt::Debug for CandidateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateFilter")
            .field("temperature", &self.temperature)
            .field("top_k", &self.top_k)
            .field("top_p", &self.top_p)
            .finish()
    }
}

pub(crate) fn invalid(msg: String) -> SamplerError {
    SamplerError::InvalidConfig(msg)
}
