use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1:8b";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Backend serving the generation endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Ollama,
    OpenAI,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Ollama => "ollama",
            Provider::OpenAI => "openai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama),
            "openai" => Ok(Provider::OpenAI),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Process-wide settings, built once at startup and passed by value into the
/// generation client constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub provider: Provider,
    pub ollama_host: String,
    pub ollama_model: String,
    pub openai_base_url: String,
    pub openai_model: String,
    /// Never serialized.
    #[serde(skip)]
    pub openai_api_key: Option<String>,
    pub temperature: f64,
    /// Fixed wall-clock timeout applied to every generation request.
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            ollama_host: DEFAULT_OLLAMA_HOST.into(),
            ollama_model: DEFAULT_OLLAMA_MODEL.into(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.into(),
            openai_model: DEFAULT_OPENAI_MODEL.into(),
            openai_api_key: None,
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup. Values are trimmed and
    /// empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();

        let provider = match get("LLM_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => defaults.provider,
        };

        let temperature = match get("TEMPERATURE") {
            Some(raw) => raw.parse::<f64>().map_err(|e| ConfigError::InvalidValue {
                key: "TEMPERATURE",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.temperature,
        };
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "TEMPERATURE",
                value: temperature.to_string(),
                reason: "must be a non-negative number".into(),
            });
        }

        let timeout_secs = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "REQUEST_TIMEOUT_SECS",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?,
            None => defaults.timeout_secs,
        };

        Ok(Self {
            provider,
            ollama_host: get("OLLAMA_HOST").unwrap_or(defaults.ollama_host),
            ollama_model: get("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            openai_model: get("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_api_key: get("OPENAI_API_KEY"),
            temperature,
            timeout_secs,
        })
    }

    /// Model identifier for the selected provider.
    pub fn model(&self) -> &str {
        match self.provider {
            Provider::Ollama => &self.ollama_model,
            Provider::OpenAI => &self.openai_model,
        }
    }
}
