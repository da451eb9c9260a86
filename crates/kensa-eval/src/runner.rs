use std::path::{Path, PathBuf};

use chrono::Local;
use futures::{StreamExt, TryStreamExt, stream};

use kensa_core::error::{EvalError, Result};

use crate::client::GenerationClient;
use crate::dataset::Task;
use crate::format::format_compliance;
use crate::metrics::{ScoreWeights, aggregate};
use crate::report::{Run, TaskResult, new_run_id, save_run};
use crate::scorer::{Scorer, ScorerKind};

/// Runs a dataset through the model under test, scores every answer and
/// aggregates the results into a [`Run`].
pub struct EvalRunner {
    client: GenerationClient,
    kind: ScorerKind,
    scorer: Box<dyn Scorer>,
    weights: ScoreWeights,
    concurrency: usize,
}

impl EvalRunner {
    pub fn new(client: GenerationClient, kind: ScorerKind) -> Self {
        let scorer = kind.build(&client);
        Self {
            client,
            kind,
            scorer,
            weights: ScoreWeights::default(),
            concurrency: 1,
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Allow up to `n` tasks in flight. Results keep input order.
    pub fn with_concurrency(mut self, n: usize) -> Result<Self> {
        if n == 0 {
            return Err(EvalError::InvalidConcurrency.into());
        }
        self.concurrency = n;
        Ok(self)
    }

    /// Evaluate every task. The first generation failure aborts the run.
    pub async fn run(&self, tasks: &[Task]) -> Result<Run> {
        if tasks.is_empty() {
            return Err(EvalError::EmptyResults.into());
        }

        tracing::info!(
            tasks = tasks.len(),
            scorer = %self.kind,
            model = self.client.model_name(),
            concurrency = self.concurrency,
            "evaluation started"
        );

        let results: Vec<TaskResult> = stream::iter(tasks)
            .map(|task| self.evaluate_task(task))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let summary = aggregate(&results)?;
        tracing::info!(
            tasks = results.len(),
            avg_final_score = summary.avg_final_score,
            "evaluation finished"
        );

        Ok(Run {
            run_id: new_run_id(&Local::now()),
            scorer: self.kind,
            weights: self.weights,
            num_tasks: results.len(),
            avg_final_score: summary.avg_final_score,
            category_metrics: summary.category_metrics,
            results,
        })
    }

    /// Evaluate `tasks` and persist the run under `out_dir`, returning the
    /// artifact path. Nothing is written if the run fails.
    pub async fn run_to_dir(&self, tasks: &[Task], out_dir: impl AsRef<Path>) -> Result<PathBuf> {
        if tasks.is_empty() {
            return Err(EvalError::EmptyResults.into());
        }
        let out_dir = out_dir.as_ref();
        std::fs::create_dir_all(out_dir)?;

        let mut run = self.run(tasks).await?;
        save_run(&mut run, out_dir)
    }

    async fn evaluate_task(&self, task: &Task) -> Result<TaskResult> {
        let generation = self.client.generate(&task.prompt, None).await?;
        let score = self
            .scorer
            .score(
                &generation.text,
                &task.expected_answer,
                task.rubric.as_deref(),
            )
            .await?;
        let format_score = format_compliance(&task.prompt, &generation.text);
        let final_score = self.weights.combine(score.value, format_score);

        tracing::debug!(
            task_id = %task.id,
            category = %task.category,
            correctness = score.value,
            format = format_score,
            final_score,
            latency_seconds = generation.latency_seconds,
            input_tokens = generation.usage.as_ref().map(|u| u.input_tokens),
            output_tokens = generation.usage.as_ref().map(|u| u.output_tokens),
            "task scored"
        );

        Ok(TaskResult {
            task_id: task.id.clone(),
            category: task.category.clone(),
            prompt: task.prompt.clone(),
            expected_answer: task.expected_answer.clone(),
            rubric: task.rubric.clone(),
            model_answer: generation.text,
            latency_seconds: generation.latency_seconds,
            correctness_score: score.value,
            format_score,
            final_score,
            details: score.details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::load_run;
    use crate::testing::ScriptedModel;
    use kensa_core::error::{KensaError, ModelError};
    use std::sync::Arc;
    use std::time::Duration;

    const PARIS: &str = "Capital of France?";
    const ICE: &str = "Is ice cold? Answer only true or false.";
    const SPEED: &str = "A car covers 120 km in 2 hours. Answer with units.";

    fn tasks() -> Vec<Task> {
        vec![
            Task::new("t1", PARIS)
                .with_category("geo")
                .with_expected("Paris"),
            Task::new("t2", ICE)
                .with_category("logic")
                .with_expected("true"),
            Task::new("t3", SPEED)
                .with_category("physics")
                .with_expected("60 km/h"),
        ]
    }

    fn model() -> ScriptedModel {
        ScriptedModel::new()
            .answer(PARIS, " paris ")
            .answer(ICE, "Yes, it is.")
            .answer(SPEED, "60 km/h")
    }

    #[tokio::test]
    async fn exact_pipeline() {
        let client = GenerationClient::new(Arc::new(model()));
        let run = EvalRunner::new(client, ScorerKind::Exact)
            .run(&tasks())
            .await
            .unwrap();

        assert_eq!(run.scorer, ScorerKind::Exact);
        assert_eq!(run.num_tasks, 3);
        assert_eq!(run.weights, ScoreWeights::default());

        let finals: Vec<_> = run.results.iter().map(|r| r.final_score).collect();
        assert_eq!(finals, vec![1.0, 0.0, 1.0]);
        assert_eq!(run.results[0].model_answer, "paris");
        assert_eq!(run.results[1].format_score, 0.0);
        assert_eq!(run.results[0].details["type"], "exact_match");
        assert_eq!(run.avg_final_score, 0.6667);

        let categories: Vec<_> = run.category_metrics.keys().cloned().collect();
        assert_eq!(categories, vec!["geo", "logic", "physics"]);
    }

    #[tokio::test]
    async fn judge_pipeline() {
        let model = Arc::new(
            ScriptedModel::new()
                .answer(PARIS, "Paris")
                .judge_reply(r#"{"score": 0.9, "hallucination": false, "explanation": "Correct."}"#),
        );
        let tasks = vec![Task::new("t1", PARIS).with_expected("Paris")];
        let runner = EvalRunner::new(GenerationClient::new(model.clone()), ScorerKind::LlmJudge);
        let run = runner.run(&tasks).await.unwrap();

        let result = &run.results[0];
        assert!((result.correctness_score - 0.9).abs() < 1e-10);
        assert_eq!(result.final_score, 0.92);
        assert_eq!(result.details["type"], "llm_judge");
        assert_eq!(result.details["explanation"], "Correct.");
        assert_eq!(run.category_metrics["unknown"].count, 1);
        assert_eq!(model.calls(), 2);
        assert_eq!(model.judge_calls(), 1);
    }

    #[tokio::test]
    async fn unusable_judge_output_scores_zero() {
        let model = ScriptedModel::new()
            .answer(PARIS, "Paris")
            .judge_reply("looks right to me");
        let tasks = vec![Task::new("t1", PARIS).with_expected("Paris")];
        let run = EvalRunner::new(GenerationClient::new(Arc::new(model)), ScorerKind::LlmJudge)
            .run(&tasks)
            .await
            .unwrap();

        let result = &run.results[0];
        assert_eq!(result.correctness_score, 0.0);
        assert_eq!(result.final_score, 0.2);
        assert_eq!(result.details["error"], "no_json_found");
    }

    #[tokio::test]
    async fn custom_weights() {
        let weights = ScoreWeights::new(0.5, 0.5).unwrap();
        let run = EvalRunner::new(GenerationClient::new(Arc::new(model())), ScorerKind::Exact)
            .with_weights(weights)
            .run(&tasks())
            .await
            .unwrap();
        assert_eq!(run.weights, weights);
        assert_eq!(run.results[1].final_score, 0.0);
        assert_eq!(run.results[0].final_score, 1.0);
    }

    #[tokio::test]
    async fn repeated_runs_agree() {
        let client = GenerationClient::new(Arc::new(model()));
        let runner = EvalRunner::new(client, ScorerKind::Exact);
        let a = runner.run(&tasks()).await.unwrap();
        let b = runner.run(&tasks()).await.unwrap();

        let scores = |run: &Run| {
            run.results
                .iter()
                .map(|r| (r.task_id.clone(), r.correctness_score, r.format_score, r.final_score))
                .collect::<Vec<_>>()
        };
        assert_eq!(scores(&a), scores(&b));
        assert_eq!(a.category_metrics, b.category_metrics);
        assert_eq!(a.avg_final_score, b.avg_final_score);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_preserves_input_order() {
        let slow_first = model()
            .delay(PARIS, Duration::from_millis(300))
            .delay(ICE, Duration::from_millis(100));
        let runner = EvalRunner::new(GenerationClient::new(Arc::new(slow_first)), ScorerKind::Exact)
            .with_concurrency(3)
            .unwrap();
        let run = runner.run(&tasks()).await.unwrap();

        let ids: Vec<_> = run.results.iter().map(|r| r.task_id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);
        assert_eq!(run.avg_final_score, 0.6667);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let client = GenerationClient::new(Arc::new(model()));
        let err = EvalRunner::new(client, ScorerKind::Exact)
            .with_concurrency(0)
            .err()
            .unwrap();
        assert!(matches!(err, KensaError::Eval(EvalError::InvalidConcurrency)));
    }

    #[tokio::test]
    async fn run_to_dir_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("runs");
        let runner = EvalRunner::new(GenerationClient::new(Arc::new(model())), ScorerKind::Exact);

        let path = runner.run_to_dir(&tasks(), &out).await.unwrap();
        assert!(path.starts_with(&out));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("json"));

        let run = load_run(&path).unwrap();
        assert_eq!(run.num_tasks, 3);
        assert_eq!(
            path.file_stem().and_then(|s| s.to_str()),
            Some(run.run_id.as_str())
        );
    }

    #[tokio::test]
    async fn generation_failure_aborts_without_artifact() {
        let model = Arc::new(model().fail_on(ICE));
        let dir = tempfile::tempdir().unwrap();
        let runner = EvalRunner::new(GenerationClient::new(model.clone()), ScorerKind::Exact);

        let err = runner.run_to_dir(&tasks(), dir.path()).await.unwrap_err();
        assert!(matches!(err, KensaError::Model(ModelError::Timeout(_))));
        assert_eq!(model.calls(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_task_list_fails_before_any_call() {
        let model = Arc::new(model());
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("runs");
        let runner = EvalRunner::new(GenerationClient::new(model.clone()), ScorerKind::Exact);

        let err = runner.run_to_dir(&[], &out).await.unwrap_err();
        assert!(matches!(err, KensaError::Eval(EvalError::EmptyResults)));
        assert_eq!(model.calls(), 0);
        assert!(!out.exists());
    }
}
