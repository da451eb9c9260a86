use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::{Message, UsageMetadata};

/// Options controlling a ChatModel invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallOptions {
    /// Sampling temperature (0.0 - 2.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl CallOptions {
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Result of a chat model generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    /// The generated message.
    pub message: Message,

    /// Token usage metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageMetadata>,
}

/// Trait for chat language models.
///
/// Implementations handle API communication, request formatting,
/// and response parsing for a specific model provider. Failures must be
/// reported as errors; an implementation never substitutes an empty reply
/// for a failed call.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a response for the given messages.
    async fn generate(&self, messages: &[Message], options: &CallOptions) -> Result<ChatResult>;

    /// Return the model name/identifier.
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{KensaError, ModelError};

    /// Replies with the last user message upper-cased, or fails on empty input.
    struct ShoutModel;

    #[async_trait]
    impl ChatModel for ShoutModel {
        async fn generate(&self, messages: &[Message], options: &CallOptions) -> Result<ChatResult> {
            let prompt = messages
                .iter()
                .rev()
                .find(|m| matches!(m, Message::User { .. }))
                .map(|m| m.content())
                .unwrap_or_default();
            if prompt.is_empty() {
                return Err(ModelError::InvalidResponse("nothing to answer".into()).into());
            }
            let mut reply = prompt.to_uppercase();
            if let Some(t) = options.temperature {
                reply = format!("{reply} (t={t})");
            }
            let output_tokens = reply.len() as u64;
            Ok(ChatResult {
                message: Message::ai(reply),
                usage: Some(UsageMetadata {
                    input_tokens: prompt.len() as u64,
                    output_tokens,
                    total_tokens: prompt.len() as u64 + output_tokens,
                }),
            })
        }

        fn model_name(&self) -> &str {
            "shout"
        }
    }

    #[tokio::test]
    async fn generate_through_trait_object() {
        let model: Box<dyn ChatModel> = Box::new(ShoutModel);
        let messages = [Message::system("be loud"), Message::user("paris")];
        let result = model
            .generate(&messages, &CallOptions::default())
            .await
            .unwrap();
        assert_eq!(result.message.content(), "PARIS");
        assert_eq!(result.usage.unwrap().total_tokens, 10);
        assert_eq!(model.model_name(), "shout");
    }

    #[tokio::test]
    async fn options_reach_the_model() {
        let opts = CallOptions::default().with_temperature(0.5);
        let result = ShoutModel
            .generate(&[Message::user("tokyo")], &opts)
            .await
            .unwrap();
        assert_eq!(result.message.content(), "TOKYO (t=0.5)");
    }

    #[tokio::test]
    async fn failures_are_errors() {
        let err = ShoutModel
            .generate(&[Message::system("only system")], &CallOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KensaError::Model(ModelError::InvalidResponse(_))
        ));
    }

    #[test]
    fn call_options_serialization() {
        assert_eq!(serde_json::to_string(&CallOptions::default()).unwrap(), "{}");

        let opts = CallOptions::default().with_temperature(0.2);
        assert_eq!(
            serde_json::to_value(&opts).unwrap(),
            serde_json::json!({"temperature": 0.2})
        );
        assert_eq!(opts.temperature, Some(0.2));
    }
}
