//! Generation client: one prompt in, trimmed text plus latency out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use kensa_core::error::{KensaError, ModelError, Result};
use kensa_core::message::{Message, UsageMetadata};
use kensa_core::model::{CallOptions, ChatModel};

use crate::metrics::round4;

/// System instruction used when the caller does not supply one.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a precise assistant. Follow instructions carefully.";

/// Text produced for one prompt and the wall-clock time it took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub latency_seconds: f64,
    /// Token counts, when the backend reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageMetadata>,
}

/// Per-call retry policy for retryable model errors.
///
/// `max_retries = 0` disables retrying: the first failure is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    /// Delay before retry number `attempt` (0-based): doubles each time,
    /// capped at `max_backoff`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Thin wrapper over a [`ChatModel`] exposing `generate(prompt, system?)`.
#[derive(Clone)]
pub struct GenerationClient {
    model: Arc<dyn ChatModel>,
    options: CallOptions,
    retry: RetryPolicy,
}

impl GenerationClient {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            options: CallOptions::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Generate a reply for `prompt`. Latency covers the successful attempt
    /// only and is rounded to 4 decimals.
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<GenerationResult> {
        let system = system
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let messages = vec![Message::system(system), Message::user(prompt)];

        let mut attempt = 0u32;
        loop {
            let start = Instant::now();
            match self.model.generate(&messages, &self.options).await {
                Ok(result) => {
                    let latency_seconds = round4(start.elapsed().as_secs_f64());
                    let usage = result.usage.or_else(|| match &result.message {
                        Message::AI(ai) => ai.usage.clone(),
                        _ => None,
                    });
                    return Ok(GenerationResult {
                        text: result.message.content().trim().to_string(),
                        latency_seconds,
                        usage,
                    });
                }
                Err(KensaError::Model(err))
                    if err.is_retryable() && attempt < self.retry.max_retries =>
                {
                    let delay = match &err {
                        ModelError::RateLimited {
                            retry_after_secs: Some(secs),
                        } => Duration::from_secs(*secs),
                        _ => self.retry.delay_for(attempt),
                    };
                    attempt += 1;
                    tracing::warn!(
                        model = self.model.model_name(),
                        attempt,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "generation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
