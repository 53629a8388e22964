use std::path::PathBuf;

use thiserror::Error;

use crate::domain::modality::Modality;

/// Failures raised by the model call or the training loop.
#[derive(Debug, Error)]
pub enum TrainError {
    /// An image could not be read while a batch was being processed.
    /// Raised by models that decode lazily; the orchestrator matches
    /// on this variant to recover.
    #[error("cannot decode image '{path}': {reason}")]
    ImageDecode { path: PathBuf, reason: String },

    #[error("{modality} model needs a {missing} input")]
    MissingModality { modality: Modality, missing: &'static str },

    #[error("{0} split is empty")]
    EmptySplit(&'static str),

    #[error("cannot build sampler: {0}")]
    Sampler(#[from] rand::distributions::WeightedError),

    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("metrics sink error: {0}")]
    Sink(String),

    #[error("gave up after {restarts} restarts caused by corrupt images")]
    RestartLimit { restarts: usize },
}
