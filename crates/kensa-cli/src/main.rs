//! `kensa`: run an LLM evaluation over a JSONL dataset and save the scored run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kensa_core::config::Settings;
use kensa_core::model::{CallOptions, ChatModel};
use kensa_eval::prelude::*;
use kensa_llm::create_chat_model;

#[derive(Parser, Debug)]
#[command(name = "kensa")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Score model answers against a JSONL dataset", long_about = None)]
struct Cli {
    /// Path to the JSONL dataset
    #[arg(long)]
    dataset: PathBuf,

    /// Correctness scorer: exact or llm_judge
    #[arg(long, default_value_t = ScorerKind::LlmJudge)]
    scorer: ScorerKind,

    /// Directory receiving the run artifact
    #[arg(long, default_value = "outputs/runs")]
    out: PathBuf,

    /// Weight of correctness in the final score; format gets the rest
    #[arg(long, default_value_t = 0.8)]
    correctness_weight: f64,

    /// Maximum number of tasks in flight
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Retries per generation call on transient failures
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "kensa=debug" } else { "kensa=info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::from_env().context("invalid configuration")?;
    let weights = ScoreWeights::from_correctness(cli.correctness_weight)?;
    let tasks = load_jsonl(&cli.dataset)
        .with_context(|| format!("failed to load dataset {}", cli.dataset.display()))?;

    let model = create_chat_model(&settings)?;
    tracing::info!(
        provider = %settings.provider,
        model = model.model_name(),
        "using model"
    );

    let client = GenerationClient::new(model)
        .with_options(CallOptions::default().with_temperature(settings.temperature))
        .with_retry(RetryPolicy::new(cli.retries));
    let runner = EvalRunner::new(client, cli.scorer)
        .with_weights(weights)
        .with_concurrency(cli.concurrency)?;

    let path = runner
        .run_to_dir(&tasks, &cli.out)
        .await
        .context("evaluation failed")?;

    println!("Saved run to {}", path.display());
    Ok(())
}
