pub mod client;
pub mod dataset;
pub mod extract;
pub mod format;
pub mod judge;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod scorer;

#[cfg(test)]
pub(crate) mod testing;

pub mod prelude {
    pub use crate::client::{GenerationClient, GenerationResult, RetryPolicy};
    pub use crate::dataset::{Task, load_jsonl, parse_jsonl};
    pub use crate::extract::extract_first_json_object;
    pub use crate::format::{FORMAT_RULES, FormatRule, format_compliance};
    pub use crate::judge::LlmJudgeScorer;
    pub use crate::metrics::{CategoryMetrics, ScoreWeights, Summary, aggregate, round4};
    pub use crate::report::{Run, TaskResult, load_run, save_run};
    pub use crate::runner::EvalRunner;
    pub use crate::scorer::{ExactMatchScorer, Score, Scorer, ScorerKind};
}
