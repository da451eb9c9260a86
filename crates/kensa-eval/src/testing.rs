//! Mock chat models shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use kensa_core::error::{ModelError, Result};
use kensa_core::message::{Message, UsageMetadata};
use kensa_core::model::{CallOptions, ChatModel, ChatResult};

use crate::judge::JUDGE_SYSTEM_PROMPT;

fn reply(text: &str) -> ChatResult {
    ChatResult {
        message: Message::ai(text),
        usage: None,
    }
}

/// Always returns the same reply and remembers the last request.
pub struct RecordingModel {
    reply: String,
    usage: Option<UsageMetadata>,
    last: Mutex<Vec<Message>>,
}

impl RecordingModel {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            usage: None,
            last: Mutex::new(Vec::new()),
        }
    }

    pub fn with_usage(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.usage = Some(UsageMetadata {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        });
        self
    }

    pub fn last_messages(&self) -> Vec<Message> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for RecordingModel {
    async fn generate(&self, messages: &[Message], _options: &CallOptions) -> Result<ChatResult> {
        *self.last.lock().unwrap() = messages.to_vec();
        Ok(ChatResult {
            usage: self.usage.clone(),
            ..reply(&self.reply)
        })
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}

/// Fails a fixed number of times before answering.
pub struct FlakyModel {
    fail_times: usize,
    reply: String,
    auth: bool,
    calls: AtomicUsize,
}

impl FlakyModel {
    pub fn new(fail_times: usize, reply: impl Into<String>) -> Self {
        Self {
            fail_times,
            reply: reply.into(),
            auth: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails every call with a non-retryable auth error.
    pub fn auth_failure() -> Self {
        Self {
            fail_times: usize::MAX,
            reply: String::new(),
            auth: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for FlakyModel {
    async fn generate(&self, _messages: &[Message], _options: &CallOptions) -> Result<ChatResult> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.auth {
            return Err(ModelError::Auth("invalid api key".into()).into());
        }
        if n < self.fail_times {
            return Err(ModelError::ApiRequest("Ollama error 503: overloaded".into()).into());
        }
        Ok(reply(&self.reply))
    }

    fn model_name(&self) -> &str {
        "flaky"
    }
}

/// Answers by user prompt; judge requests (recognised by their system
/// instruction) get the configured judge reply.
#[derive(Default)]
pub struct ScriptedModel {
    answers: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    failing: Vec<String>,
    judge_reply: String,
    calls: AtomicUsize,
    judge_calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, prompt: impl Into<String>, reply: impl Into<String>) -> Self {
        self.answers.insert(prompt.into(), reply.into());
        self
    }

    pub fn delay(mut self, prompt: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(prompt.into(), delay);
        self
    }

    pub fn fail_on(mut self, prompt: impl Into<String>) -> Self {
        self.failing.push(prompt.into());
        self
    }

    pub fn judge_reply(mut self, reply: impl Into<String>) -> Self {
        self.judge_reply = reply.into();
        self
    }

    /// Total calls, judge calls included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn judge_calls(&self) -> usize {
        self.judge_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn generate(&self, messages: &[Message], _options: &CallOptions) -> Result<ChatResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let is_judge = messages
            .iter()
            .any(|m| matches!(m, Message::System { content } if content == JUDGE_SYSTEM_PROMPT));
        if is_judge {
            self.judge_calls.fetch_add(1, Ordering::SeqCst);
            return Ok(reply(&self.judge_reply));
        }

        let prompt = messages
            .iter()
            .rev()
            .find(|m| matches!(m, Message::User { .. }))
            .map(|m| m.content())
            .unwrap_or_default();

        if let Some(delay) = self.delays.get(prompt) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.iter().any(|p| p == prompt) {
            return Err(ModelError::Timeout(format!("no reply for '{prompt}'")).into());
        }

        Ok(reply(self.answers.get(prompt).map(String::as_str).unwrap_or("")))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
