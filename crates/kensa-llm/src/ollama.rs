//! Ollama `/api/chat` integration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use kensa_core::error::{KensaError, ModelError, Result};
use kensa_core::message::{AIContent, Message, UsageMetadata};
use kensa_core::model::{CallOptions, ChatModel, ChatResult};

use crate::http::{status_error, transport_error};

// ---------------------------------------------------------------------------
// Ollama API request/response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct OllamaRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
    pub stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OllamaMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct OllamaOptions {
    pub temperature: f64,
}

#[derive(Debug, Deserialize)]
pub struct OllamaResponse {
    #[serde(default)]
    pub message: Option<OllamaMessage>,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

// ---------------------------------------------------------------------------
// OllamaChatModel
// ---------------------------------------------------------------------------

pub struct OllamaChatModel {
    host: String,
    model_id: String,
    client: reqwest::Client,
}

impl OllamaChatModel {
    pub fn new(host: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            model_id: model_id.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured client (e.g. one carrying a request timeout).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.host)
    }

    pub fn build_request(&self, messages: &[Message], options: &CallOptions) -> OllamaRequest {
        let ollama_options = options
            .temperature
            .map(|temperature| OllamaOptions { temperature });

        OllamaRequest {
            model: self.model_id.clone(),
            messages: messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role().to_string(),
                    content: m.content().to_string(),
                })
                .collect(),
            options: ollama_options,
            stream: false,
        }
    }
}

/// Convert a non-streaming Ollama reply into a [`ChatResult`].
pub fn parse_response(response: OllamaResponse) -> ChatResult {
    let text = response.message.map(|m| m.content).unwrap_or_default();

    let usage = match (response.prompt_eval_count, response.eval_count) {
        (None, None) => None,
        (input, output) => {
            let input_tokens = input.unwrap_or(0);
            let output_tokens = output.unwrap_or(0);
            Some(UsageMetadata {
                input_tokens,
                output_tokens,
                total_tokens: input_tokens + output_tokens,
            })
        }
    };

    ChatResult {
        message: Message::AI(AIContent {
            content: text,
            usage: usage.clone(),
        }),
        usage,
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    async fn generate(&self, messages: &[Message], options: &CallOptions) -> Result<ChatResult> {
        let request_body = self.build_request(messages, options);

        let response = self
            .client
            .post(self.chat_url())
            .json(&request_body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read response body".into());
            return Err(status_error("Ollama", status, &body));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| KensaError::Model(ModelError::InvalidResponse(e.to_string())))?;

        tracing::trace!(model = %self.model_id, "ollama chat completed");
        Ok(parse_response(ollama_response))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
