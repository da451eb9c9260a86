//! OpenAI-compatible Chat Completions integration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use kensa_core::config::DEFAULT_OPENAI_BASE_URL;
use kensa_core::error::{KensaError, ModelError, Result};
use kensa_core::message::{AIContent, Message, UsageMetadata};
use kensa_core::model::{CallOptions, ChatModel, ChatResult};

use crate::http::{status_error, transport_error};

// ---------------------------------------------------------------------------
// OpenAI Chat Completions API request/response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    pub model: String,
    pub messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenAIMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIError {
    pub error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIErrorDetail {
    pub message: String,
}

// ---------------------------------------------------------------------------
// OpenAIChatModel
// ---------------------------------------------------------------------------

pub struct OpenAIChatModel {
    api_key: String,
    model_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIChatModel {
    pub fn new(api_key: String, model_id: String) -> Self {
        Self {
            api_key,
            model_id,
            base_url: DEFAULT_OPENAI_BASE_URL.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Point at any OpenAI-compatible server (vLLM, LM Studio, a proxy, ...).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub fn build_request(&self, messages: &[Message], options: &CallOptions) -> OpenAIRequest {
        OpenAIRequest {
            model: self.model_id.clone(),
            messages: messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: m.role().to_string(),
                    content: Some(m.content().to_string()),
                })
                .collect(),
            temperature: options.temperature,
        }
    }
}

pub fn parse_response(response: OpenAIResponse) -> ChatResult {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    let usage = response.usage.map(|u| UsageMetadata {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    ChatResult {
        message: Message::AI(AIContent {
            content: text,
            usage: usage.clone(),
        }),
        usage,
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn generate(&self, messages: &[Message], options: &CallOptions) -> Result<ChatResult> {
        let request_body = self.build_request(messages, options);

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
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
            let error_msg = serde_json::from_str::<OpenAIError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(status_error("OpenAI", status, &error_msg));
        }

        let api_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| KensaError::Model(ModelError::InvalidResponse(e.to_string())))?;

        Ok(parse_response(api_response))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}
