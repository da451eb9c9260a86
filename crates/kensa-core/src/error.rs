use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the Kensa toolkit.
#[derive(Debug, Error)]
pub enum KensaError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("API request failed: {0}")]
    ApiRequest(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },
}

impl ModelError {
    /// Whether a later attempt of the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModelError::ApiRequest(_) | ModelError::Timeout(_) | ModelError::RateLimited { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {message}")]
    InvalidLine { line: usize, message: String },

    #[error("line {line}: missing required field '{field}'")]
    MissingField { line: usize, field: &'static str },

    #[error("dataset is empty: {0}")]
    Empty(String),
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("weights must lie in [0, 1] and sum to 1 (correctness={correctness}, format={format})")]
    InvalidWeights { correctness: f64, format: f64 },

    #[error("cannot aggregate an empty result set")]
    EmptyResults,

    #[error("concurrency must be at least 1")]
    InvalidConcurrency,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("missing required setting: {0}")]
    MissingValue(&'static str),

    #[error("unknown LLM provider: {0}")]
    UnknownProvider(String),
}

pub type Result<T> = std::result::Result<T, KensaError>;
