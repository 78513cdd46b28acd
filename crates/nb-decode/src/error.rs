use nb_model::ModelError;
use nb_sampler::SamplerError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("model has an empty vocabulary")]
    EmptyVocabulary,
}

impl From<ModelError> for DecodeError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::InvalidInput(msg) => DecodeError::InvalidInput(msg),
            ModelError::InvalidConfig(msg) => DecodeError::InvalidConfig(msg),
        }
    }
}

impl From<SamplerError> for DecodeError {
    fn from(e: SamplerError) -> Self {
        match e {
            SamplerError::InvalidConfig(msg) => DecodeError::InvalidConfig(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
