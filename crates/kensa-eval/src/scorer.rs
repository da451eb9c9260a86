use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use kensa_core::error::Result;

use crate::client::GenerationClient;
use crate::judge::LlmJudgeScorer;

/// Correctness score produced by a [`Scorer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Always within `[0, 1]`.
    pub value: f64,
    /// Free-form diagnostics; always carries a `type` tag.
    pub details: Map<String, Value>,
}

impl Score {
    /// Build a score, clamping `value` into `[0, 1]`. NaN becomes 0.
    pub fn new(value: f64, details: Map<String, Value>) -> Self {
        let value = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 1.0)
        };
        Self { value, details }
    }

    pub fn zero(details: Map<String, Value>) -> Self {
        Self::new(0.0, details)
    }
}

/// A strategy producing a correctness score for one model answer.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Name of this scorer, as recorded in the run artifact.
    fn name(&self) -> &str;

    /// Score `predicted` against `expected`.
    ///
    /// Errors are reserved for failures that must abort the run (a judge
    /// transport failure); bad judge output degrades to a zero score.
    async fn score(&self, predicted: &str, expected: &str, rubric: Option<&str>) -> Result<Score>;
}

/// Case- and whitespace-insensitive string equality.
pub struct ExactMatchScorer;

impl ExactMatchScorer {
    fn normalize(s: &str) -> String {
        s.trim().to_lowercase()
    }

    pub fn score_sync(&self, predicted: &str, expected: &str) -> Score {
        let matched = Self::normalize(predicted) == Self::normalize(expected);
        let mut details = Map::new();
        details.insert("type".into(), json!("exact_match"));
        Score::new(if matched { 1.0 } else { 0.0 }, details)
    }
}

#[async_trait]
impl Scorer for ExactMatchScorer {
    fn name(&self) -> &str {
        "exact"
    }

    async fn score(&self, predicted: &str, expected: &str, _rubric: Option<&str>) -> Result<Score> {
        Ok(self.score_sync(predicted, expected))
    }
}

/// The closed set of scoring strategies, chosen once per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    Exact,
    #[default]
    LlmJudge,
}

impl ScorerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScorerKind::Exact => "exact",
            ScorerKind::LlmJudge => "llm_judge",
        }
    }

    /// Instantiate the scorer. The judge reuses `client` for its grading call.
    pub fn build(&self, client: &GenerationClient) -> Box<dyn Scorer> {
        match self {
            ScorerKind::Exact => Box::new(ExactMatchScorer),
            ScorerKind::LlmJudge => Box::new(LlmJudgeScorer::new(client.clone())),
        }
    }
}

impl fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScorerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "exact" => Ok(ScorerKind::Exact),
            "llm_judge" => Ok(ScorerKind::LlmJudge),
            other => Err(format!(
                "unknown scorer '{other}' (expected 'exact' or 'llm_judge')"
            )),
        }
    }
}
