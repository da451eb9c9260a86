use std::sync::Arc;
use std::time::Duration;

use kensa_core::config::{Provider, Settings};
use kensa_core::error::{ConfigError, Result};
use kensa_core::model::ChatModel;

use crate::http::build_client;
use crate::ollama::OllamaChatModel;
use crate::openai::OpenAIChatModel;

/// Create the ChatModel selected by `settings`, with the configured request
/// timeout applied to its HTTP client.
pub fn create_chat_model(settings: &Settings) -> Result<Arc<dyn ChatModel>> {
    let client = build_client(Duration::from_secs(settings.timeout_secs))?;

    let model: Arc<dyn ChatModel> = match settings.provider {
        Provider::Ollama => Arc::new(
            OllamaChatModel::new(&settings.ollama_host, &settings.ollama_model)
                .with_client(client),
        ),
        Provider::OpenAI => {
            let api_key = settings
                .openai_api_key
                .clone()
                .ok_or(ConfigError::MissingValue("OPENAI_API_KEY"))?;
            Arc::new(
                OpenAIChatModel::new(api_key, settings.openai_model.clone())
                    .with_base_url(&settings.openai_base_url)
                    .with_client(client),
            )
        }
    };

    tracing::debug!(
        provider = %settings.provider,
        model = model.model_name(),
        timeout_secs = settings.timeout_secs,
        "chat model created"
    );
    Ok(model)
}
