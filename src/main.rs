//! FinQA RAG CLI
//!
//! Answers financial-report questions with retrieval-augmented generation
//! and grades the answers with an LLM judge.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use finqa_rag::{
    AnswerEvaluator, BatchRunner, Config, Embedder, LlmClient, OpenAiEmbedder, PredictionRecord,
    persistence::{
        EVALUATIONS_FILENAME, PREDICTIONS_FILENAME, REPORT_FILENAME, load_evaluations,
        load_predictions, save_evaluations, save_predictions, save_report,
    },
    report::load_reports,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// FinQA RAG - question answering and grading over financial reports
#[derive(Parser)]
#[command(name = "finqa")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PredictArgs {
    /// Path to the dataset (JSON array of reports)
    dataset: PathBuf,

    /// Only process the first N reports
    #[arg(long)]
    limit: Option<usize>,

    /// Record failed reports and continue instead of aborting
    #[arg(long)]
    keep_going: bool,

    /// Passages to retrieve per question (overrides config)
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Embed with a local sentence-transformers model instead of the API
    #[cfg(feature = "local-embeddings")]
    #[arg(long)]
    local_embeddings: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer every report's question and write predictions
    Predict {
        #[command(flatten)]
        args: PredictArgs,

        /// Output path for predictions (.csv or .json)
        #[arg(short, long, default_value = "data/results/predictions.csv")]
        output: PathBuf,
    },

    /// Grade predictions against the ground truth
    Evaluate {
        /// Predictions file written by `predict`
        predictions: PathBuf,

        /// Output path for graded predictions
        #[arg(short, long, default_value = "data/results/evaluations.csv")]
        output: PathBuf,
    },

    /// Summarise graded predictions by score
    Report {
        /// Evaluations file written by `evaluate`
        evaluations: PathBuf,

        /// Output path for the summary table
        #[arg(short, long, default_value = "data/results/report.csv")]
        output: PathBuf,
    },

    /// Predict, evaluate and report in one go
    Run {
        #[command(flatten)]
        args: PredictArgs,

        /// Directory for all three output tables
        #[arg(long, default_value = "data/results")]
        out_dir: PathBuf,
    },

    /// Test LLM connection
    Test,
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = run().await {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Predict { args, output } => {
            let config = load_config()?;
            let predictions = cmd_predict(&config, &args, &output).await?;
            info!(count = predictions.len(), "predictions complete");
            Ok(())
        }
        Commands::Evaluate {
            predictions,
            output,
        } => {
            let config = load_config()?;
            let records = load_predictions(&predictions)
                .with_context(|| format!("Failed to read {}", predictions.display()))?;
            cmd_evaluate(&config, &records, &output).await
        }
        Commands::Report {
            evaluations,
            output,
        } => cmd_report(&evaluations, &output),
        Commands::Run { args, out_dir } => {
            let config = load_config()?;
            let start = Instant::now();

            let predictions =
                cmd_predict(&config, &args, &out_dir.join(PREDICTIONS_FILENAME)).await?;
            let evaluations_path = out_dir.join(EVALUATIONS_FILENAME);
            cmd_evaluate(&config, &predictions, &evaluations_path).await?;
            cmd_report(&evaluations_path, &out_dir.join(REPORT_FILENAME))?;

            info!(elapsed = ?start.elapsed(), "run complete");
            Ok(())
        }
        Commands::Test => cmd_test().await,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> Result<Config> {
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_embedder(config: &Config, args: &PredictArgs) -> Result<Arc<dyn Embedder>> {
    #[cfg(feature = "local-embeddings")]
    if args.local_embeddings {
        let local = finqa_rag::embeddings::LocalEmbedder::load_minilm()
            .context("Failed to load local embedding model")?;
        return Ok(Arc::new(local));
    }
    #[cfg(not(feature = "local-embeddings"))]
    let _ = args;

    let embedder = OpenAiEmbedder::new(config.embedding.clone());
    info!(model = embedder.model(), "using embedding API");
    Ok(Arc::new(embedder))
}

async fn cmd_predict(
    config: &Config,
    args: &PredictArgs,
    output: &Path,
) -> Result<Vec<PredictionRecord>> {
    let reports = load_reports(&args.dataset).context("Failed to load dataset")?;

    let mut pipeline_config = config.pipeline.clone();
    if let Some(top_k) = args.top_k {
        anyhow::ensure!(top_k > 0, "--top-k must be at least 1");
        pipeline_config.top_k = top_k;
    }

    info!(
        reports = reports.len(),
        model = %config.generator.model,
        top_k = pipeline_config.top_k,
        "starting batch inference"
    );

    let runner = BatchRunner::new(
        build_embedder(config, args)?,
        Arc::new(LlmClient::new(config.generator.clone())),
        pipeline_config,
    )
    .with_limit(args.limit);

    let predictions = if args.keep_going {
        let results = runner.run_isolated(&reports).await;
        if !results.failures.is_empty() {
            warn!(failed = results.failures.len(), "some reports failed");
            let failures_path = output.with_extension("failures.json");
            let json = serde_json::to_string_pretty(&results.failures)?;
            std::fs::write(&failures_path, json)
                .with_context(|| format!("Failed to write {}", failures_path.display()))?;
            info!(path = %failures_path.display(), "wrote failure log");
        }
        results.predictions
    } else {
        runner.run(&reports).await.context("Batch inference failed")?
    };

    save_predictions(&predictions, output).context("Failed to save predictions")?;
    Ok(predictions)
}

async fn cmd_evaluate(config: &Config, predictions: &[PredictionRecord], output: &Path) -> Result<()> {
    info!(
        records = predictions.len(),
        model = %config.grader.model,
        "grading predictions"
    );

    let evaluator = AnswerEvaluator::new(Arc::new(LlmClient::new(config.grader.clone())));
    let evaluations = evaluator
        .run(predictions)
        .await
        .context("Evaluation failed")?;

    save_evaluations(&evaluations, output).context("Failed to save evaluations")?;
    Ok(())
}

fn cmd_report(evaluations_path: &Path, output: &Path) -> Result<()> {
    let evaluations = load_evaluations(evaluations_path)
        .with_context(|| format!("Failed to read {}", evaluations_path.display()))?;

    let report = AnswerEvaluator::create_report(&evaluations);
    save_report(&report, output).context("Failed to save report")?;

    println!("{}", report);
    if let Some(mean) = report.mean_score() {
        println!("mean score: {:.3}", mean);
    }
    Ok(())
}

async fn cmd_test() -> Result<()> {
    let config = load_config()?;

    for (role, llm) in [("generator", &config.generator), ("grader", &config.grader)] {
        info!(role, api_base = %llm.api_base, model = %llm.model, "sending test request");
        let client = LlmClient::new(llm.clone());
        client
            .test_connection()
            .await
            .with_context(|| format!("{} connection failed", role))?;
        println!("{} ({}): connection successful", role, llm.model);
    }

    Ok(())
}
