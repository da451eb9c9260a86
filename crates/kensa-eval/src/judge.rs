use async_trait::async_trait;
use serde_json::{Map, Value, json};

use kensa_core::error::Result;

use crate::client::GenerationClient;
use crate::extract::extract_first_json_object;
use crate::scorer::{Score, Scorer};

/// System instruction sent with every grading request.
pub const JUDGE_SYSTEM_PROMPT: &str = "You output ONLY valid JSON. No markdown. No code fences.";

/// Rubric used when a task carries none.
pub const DEFAULT_RUBRIC: &str = "Judge correctness vs expected answer.";

const RAW_CHARS: usize = 800;
const EXPLANATION_CHARS: usize = 500;

/// Scores an answer by asking a model to grade it against a reference.
pub struct LlmJudgeScorer {
    client: GenerationClient,
}

impl LlmJudgeScorer {
    pub fn new(client: GenerationClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Scorer for LlmJudgeScorer {
    fn name(&self) -> &str {
        "llm_judge"
    }

    async fn score(&self, predicted: &str, expected: &str, rubric: Option<&str>) -> Result<Score> {
        let prompt = build_judge_prompt(predicted, expected, rubric);
        let reply = self
            .client
            .generate(&prompt, Some(JUDGE_SYSTEM_PROMPT))
            .await?;

        let mut score = parse_judgment(&reply.text, reply.latency_seconds);
        if let Some(usage) = &reply.usage {
            score
                .details
                .insert("judge_input_tokens".into(), json!(usage.input_tokens));
            score
                .details
                .insert("judge_output_tokens".into(), json!(usage.output_tokens));
        }
        if let Some(err) = score.details.get("error") {
            tracing::debug!(error = %err, "judge output unusable, scoring 0");
        }
        Ok(score)
    }
}

/// Grading prompt embedding the rubric, the reference and the model answer.
pub fn build_judge_prompt(predicted: &str, expected: &str, rubric: Option<&str>) -> String {
    let rubric = rubric
        .filter(|r| !r.trim().is_empty())
        .unwrap_or(DEFAULT_RUBRIC);

    format!(
        "You are an evaluator. Grade the model answer against the rubric and reference.\n\n\
         Rubric:\n{rubric}\n\n\
         Expected answer (reference):\n{expected}\n\n\
         Model answer:\n{predicted}\n\n\
         Return ONLY a JSON object with keys:\n\
         score (number 0..1),\n\
         hallucination (true/false),\n\
         explanation (string, <= 2 sentences).\n\n\
         Do NOT include markdown, code fences, or any extra text."
    )
}

/// Turn raw judge output into a score. Never fails: unusable output yields
/// 0.0 with the reason recorded under `error`.
pub fn parse_judgment(raw: &str, judge_latency_seconds: f64) -> Score {
    let mut details = Map::new();
    details.insert("type".into(), json!("llm_judge"));

    let Some(extracted) = extract_first_json_object(raw) else {
        details.insert("error".into(), json!("no_json_found"));
        details.insert("raw".into(), json!(head(raw, RAW_CHARS)));
        return Score::zero(details);
    };

    let obj = match serde_json::from_str::<Value>(extracted) {
        Ok(Value::Object(obj)) => obj,
        Ok(other) => {
            return parse_failed(details, raw, extracted, &format!("expected a JSON object, got {other}"));
        }
        Err(e) => return parse_failed(details, raw, extracted, &e.to_string()),
    };

    let value = obj.get("score").map(coerce_score).unwrap_or(0.0);
    let hallucination = obj.get("hallucination").is_some_and(coerce_flag);
    let explanation = match obj.get("explanation") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    details.insert("hallucination".into(), json!(hallucination));
    details.insert(
        "explanation".into(),
        json!(head(&explanation, EXPLANATION_CHARS)),
    );
    details.insert("judge_latency_seconds".into(), json!(judge_latency_seconds));
    details.insert("raw_extracted".into(), json!(extracted));
    Score::new(value, details)
}

fn parse_failed(mut details: Map<String, Value>, raw: &str, extracted: &str, msg: &str) -> Score {
    details.insert("error".into(), json!(format!("judge_parse_failed: {msg}")));
    details.insert("raw".into(), json!(head(raw, RAW_CHARS)));
    details.insert("extracted".into(), json!(head(extracted, RAW_CHARS)));
    Score::zero(details)
}

fn coerce_score(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    }
}

fn coerce_flag(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        _ => false,
    }
}

/// First `n` characters of `s`.
fn head(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
