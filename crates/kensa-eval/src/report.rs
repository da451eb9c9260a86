//! The persisted run artifact.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use kensa_core::error::Result;

use crate::metrics::{CategoryMetrics, ScoreWeights};
use crate::scorer::ScorerKind;

const RUN_ID_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// Outcome of one task within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub category: String,
    pub prompt: String,
    pub expected_answer: String,
    pub rubric: Option<String>,
    pub model_answer: String,
    pub latency_seconds: f64,
    pub correctness_score: f64,
    pub format_score: f64,
    pub final_score: f64,
    pub details: Map<String, Value>,
}

/// One evaluation pass over a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub scorer: ScorerKind,
    pub weights: ScoreWeights,
    pub num_tasks: usize,
    pub avg_final_score: f64,
    pub category_metrics: IndexMap<String, CategoryMetrics>,
    pub results: Vec<TaskResult>,
}

/// Timestamp-based run id, e.g. `2026-01-31_142501`.
pub fn new_run_id<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format(RUN_ID_FORMAT).to_string()
}

/// `base`, or `base_1`, `base_2`, ... if `{base}.json` already exists in `dir`.
pub fn unique_run_id(dir: &Path, base: &str) -> String {
    if !dir.join(format!("{base}.json")).exists() {
        return base.to_string();
    }
    (1u32..)
        .map(|n| format!("{base}_{n}"))
        .find(|id| !dir.join(format!("{id}.json")).exists())
        .unwrap_or_else(|| base.to_string())
}

/// Write `run` as pretty-printed JSON to `{dir}/{run_id}.json`.
///
/// The directory is created if needed. An existing file is never
/// overwritten: the run id gains a numeric suffix instead, and `run.run_id`
/// is updated to match the file name.
pub fn save_run(run: &mut Run, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    loop {
        run.run_id = unique_run_id(dir, &run.run_id);
        let path = dir.join(format!("{}.json", run.run_id));
        let body = serde_json::to_string_pretty(&*run)?;

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(body.as_bytes())?;
                file.write_all(b"\n")?;
                tracing::info!(path = %path.display(), "run saved");
                return Ok(path);
            }
            // Another writer claimed the name between the check and the open.
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Read a run artifact back from disk.
pub fn load_run(path: &Path) -> Result<Run> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
