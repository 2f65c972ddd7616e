//! Retrieve-then-generate question answering over one report index.
//!
//! The pipeline is a fixed two-stage state machine:
//! `Start -> Retrieved -> Answered`. There is no branching and no retry;
//! any failure ends the run.

use crate::config::PipelineConfig;
use crate::document::IndexedDocument;
use crate::error::{RagError, Result};
use crate::index::SimilarityIndex;
use crate::llm::{Prompts, TextGenerator, fill_template};

/// Separator placed between context documents in the prompt.
const CONTEXT_SEPARATOR: &str = "\n\n";

/// Where a pipeline run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Retrieved,
    Answered,
}

/// Transient record carried through the stages for one question.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub question: String,
    pub context: Vec<IndexedDocument>,
    pub answer: Option<String>,
    pub stage: Stage,
}

impl PipelineState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            context: Vec::new(),
            answer: None,
            stage: Stage::Start,
        }
    }

    fn expect_stage(&self, expected: Stage) -> Result<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(RagError::Pipeline(format!(
                "expected stage {:?}, found {:?}",
                expected, self.stage
            )))
        }
    }
}

/// QA pipeline bound to one report's index.
pub struct QaPipeline<'a> {
    index: &'a dyn SimilarityIndex,
    table_id: &'a str,
    generator: &'a dyn TextGenerator,
    top_k: usize,
    prompt_template: &'a str,
}

impl<'a> QaPipeline<'a> {
    /// Create a pipeline using the default QA prompt.
    pub fn new(
        index: &'a dyn SimilarityIndex,
        table_id: &'a str,
        generator: &'a dyn TextGenerator,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            index,
            table_id,
            generator,
            top_k: config.top_k,
            prompt_template: Prompts::qa(),
        }
    }

    /// Replace the QA prompt. The template must contain `{question}` and `{context}`.
    pub fn with_prompt(mut self, template: &'a str) -> Self {
        self.prompt_template = template;
        self
    }

    /// Start -> Retrieved: top-k passages by similarity, plus the table document.
    pub async fn retrieve(&self, mut state: PipelineState) -> Result<PipelineState> {
        state.expect_stage(Stage::Start)?;

        let hits = self
            .index
            .similarity_search(&state.question, self.top_k)
            .await
            .map_err(|e| match e {
                RagError::Retrieval(_) => e,
                other => RagError::Retrieval(other.to_string()),
            })?;

        let mut context: Vec<IndexedDocument> = hits.into_iter().map(|hit| hit.document).collect();

        if !context.iter().any(|doc| doc.id == self.table_id) {
            let table = self.index.get_by_id(self.table_id).ok_or_else(|| {
                RagError::Retrieval(format!("table document '{}' not in index", self.table_id))
            })?;
            context.push(table.clone());
        }

        tracing::debug!(documents = context.len(), top_k = self.top_k, "retrieved context");

        state.context = context;
        state.stage = Stage::Retrieved;
        Ok(state)
    }

    /// Fill the prompt template with the question and joined context.
    pub fn build_prompt(&self, state: &PipelineState) -> String {
        let context = state
            .context
            .iter()
            .map(|doc| doc.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        fill_template(
            self.prompt_template,
            &[("question", state.question.as_str()), ("context", context.as_str())],
        )
    }

    /// Retrieved -> Answered: prompt the generator with the retrieved context.
    pub async fn generate(&self, mut state: PipelineState) -> Result<PipelineState> {
        state.expect_stage(Stage::Retrieved)?;

        let prompt = self.build_prompt(&state);
        let answer = self
            .generator
            .generate(None, &prompt)
            .await
            .map_err(|e| RagError::Generation(e.to_string()))?;

        if answer.trim().is_empty() {
            return Err(RagError::Generation("model returned an empty answer".to_string()));
        }

        state.answer = Some(answer);
        state.stage = Stage::Answered;
        Ok(state)
    }

    /// Run both stages for a question.
    pub async fn invoke(&self, question: &str) -> Result<PipelineState> {
        let state = self.retrieve(PipelineState::new(question)).await?;
        self.generate(state).await
    }

    /// Run both stages and return only the answer.
    pub async fn answer(&self, question: &str) -> Result<String> {
        let state = self.invoke(question).await?;
        state
            .answer
            .ok_or_else(|| RagError::Pipeline("pipeline finished without an answer".to_string()))
    }
}
