//! Shared HTTP plumbing for the chat model backends.

use std::time::Duration;

use kensa_core::error::{KensaError, ModelError, Result};

/// Maximum number of characters of an error body carried into error messages.
pub const ERROR_BODY_CHARS: usize = 300;

/// Build a client whose requests fail once `timeout` has elapsed.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| KensaError::Other(format!("failed to build HTTP client: {e}")))
}

/// Map a transport-level failure, keeping timeouts distinguishable.
pub fn transport_error(err: reqwest::Error) -> KensaError {
    if err.is_timeout() {
        KensaError::Model(ModelError::Timeout(err.to_string()))
    } else {
        KensaError::Model(ModelError::ApiRequest(err.to_string()))
    }
}

/// Map a non-success HTTP status to a model error.
pub fn status_error(backend: &str, status: reqwest::StatusCode, body: &str) -> KensaError {
    let snippet = truncate_chars(body, ERROR_BODY_CHARS);
    KensaError::Model(match status.as_u16() {
        401 | 403 => ModelError::Auth(format!("{backend} error {}: {snippet}", status.as_u16())),
        429 => ModelError::RateLimited {
            retry_after_secs: None,
        },
        code => ModelError::ApiRequest(format!("{backend} error {code}: {snippet}")),
    })
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
