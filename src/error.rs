//! Error types for the model backends, the article store and the pipeline.

use crate::api::ModelSelector;
use thiserror::Error;

/// Failure talking to a model backend.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{backend} returned {status}: {body}")]
    Status {
        backend: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{0} returned no completion text")]
    EmptyCompletion(&'static str),
}

/// Failure reading or writing the article store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("look-back window of {0} days is out of range")]
    WindowOutOfRange(i64),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The selected model has no invoker bound to it.
    #[error("no backend configured for model '{0}'")]
    MissingBackend(ModelSelector),

    #[error("invalid batch options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
