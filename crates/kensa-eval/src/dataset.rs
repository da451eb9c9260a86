use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use kensa_core::error::{DatasetError, Result};

pub const DEFAULT_CATEGORY: &str = "unknown";

/// A single evaluation task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for this task.
    pub id: String,
    /// Bucket used for per-category metrics.
    pub category: String,
    /// Prompt sent to the model under test.
    pub prompt: String,
    /// Reference answer.
    pub expected_answer: String,
    /// Grading guidance for the judge; `None` means the default rubric.
    pub rubric: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: DEFAULT_CATEGORY.into(),
            prompt: prompt.into(),
            expected_answer: String::new(),
            rubric: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected_answer = expected.into();
        self
    }

    pub fn with_rubric(mut self, rubric: impl Into<String>) -> Self {
        self.rubric = Some(rubric.into());
        self
    }
}

/// Load tasks from a newline-delimited JSON file.
pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Vec<Task>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let tasks = parse_jsonl(&content, &path.display().to_string())?;
    tracing::info!(path = %path.display(), tasks = tasks.len(), "dataset loaded");
    Ok(tasks)
}

/// Parse newline-delimited JSON. `source` names the input in error messages.
///
/// Blank lines are skipped. A dataset with no tasks is an error.
pub fn parse_jsonl(content: &str, source: &str) -> Result<Vec<Task>> {
    let mut tasks = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(line).map_err(|e| DatasetError::InvalidLine {
            line: line_no,
            message: e.to_string(),
        })?;
        let Value::Object(obj) = value else {
            return Err(DatasetError::InvalidLine {
                line: line_no,
                message: "expected a JSON object".into(),
            }
            .into());
        };

        tasks.push(task_from_object(&obj, line_no)?);
    }

    if tasks.is_empty() {
        return Err(DatasetError::Empty(source.to_string()).into());
    }

    Ok(tasks)
}

fn task_from_object(obj: &Map<String, Value>, line: usize) -> Result<Task> {
    let required = |field: &'static str| {
        obj.get(field)
            .filter(|v| !v.is_null())
            .map(value_to_string)
            .ok_or(DatasetError::MissingField { line, field })
    };
    let optional = |field: &str| obj.get(field).filter(|v| !v.is_null()).map(value_to_string);

    Ok(Task {
        id: required("id")?,
        category: optional("category").unwrap_or_else(|| DEFAULT_CATEGORY.into()),
        prompt: required("prompt")?,
        expected_answer: optional("expected_answer").unwrap_or_default(),
        rubric: optional("rubric"),
    })
}

/// Strings are taken verbatim; any other value uses its JSON text, so
/// `42` becomes `"42"`.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
