pub mod candidate;
pub mod error;
pub mod filter;
pub mod penalty;
pub mod select;
pub mod temperature;
pub mod top_k;
pub mod top_p;

pub use candidate::Candidate;
pub use error::{Result, SamplerError};
pub use filter::{CandidateFilter, Filter, FilterChain};
pub use penalty::Penalty;
pub use select::{greedy_pick, sample_index};
pub use temperature::TemperatureFilter;
pub use top_k::TopKFilter;
pub use top_p::TopPFilter;
