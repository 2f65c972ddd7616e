//! FinQA RAG - retrieval-augmented question answering over financial reports.
//!
//! Each report (narrative text plus one table) is indexed on its own, the
//! question is answered from the top-ranked passages and the table, and the
//! generated answers are graded against the ground truth by a second model.
//!
//! # Quick Start
//!
//! ```no_run
//! use finqa_rag::{
//!     AnswerEvaluator, BatchRunner, Config, LlmClient, OpenAiEmbedder,
//!     report::load_reports,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let reports = load_reports(Path::new("data/train.json"))?;
//!
//!     let runner = BatchRunner::new(
//!         Arc::new(OpenAiEmbedder::new(config.embedding.clone())),
//!         Arc::new(LlmClient::new(config.generator.clone())),
//!         config.pipeline.clone(),
//!     );
//!     let predictions = runner.run(&reports).await?;
//!
//!     let evaluator = AnswerEvaluator::new(Arc::new(LlmClient::new(config.grader.clone())));
//!     let evaluations = evaluator.run(&predictions).await?;
//!     println!("{}", AnswerEvaluator::create_report(&evaluations));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **report**: dataset loading and `qa` -> `qa_0` normalization
//! - **table**: aligned text rendering of report tables
//! - **embeddings** / **index**: `Embedder` and `SimilarityIndex` capabilities
//! - **indexer**: one fresh index per report
//! - **pipeline**: retrieve -> generate state machine
//! - **runner**: batch inference in input order
//! - **evaluator**: LLM-as-judge grading and score summary

pub mod config;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod evaluator;
pub mod index;
pub mod indexer;
pub mod llm;
pub mod persistence;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod table;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::Config;
pub use embeddings::{Embedder, OpenAiEmbedder};
pub use error::{RagError, Result};
pub use evaluator::{AnswerEvaluator, EvaluationRecord, Score, SummaryReport};
pub use index::{InMemoryIndex, SimilarityIndex};
pub use indexer::ReportIndexer;
pub use llm::{LlmClient, TextGenerator};
pub use pipeline::{PipelineState, QaPipeline};
pub use report::{QaPair, Report};
pub use runner::{BatchRunner, PredictionRecord};
