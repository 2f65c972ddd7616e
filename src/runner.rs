//! Batch inference over a dataset of reports.

use crate::config::PipelineConfig;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::indexer::ReportIndexer;
use crate::llm::TextGenerator;
use crate::pipeline::QaPipeline;
use crate::report::Report;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One row of batch output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub question: String,
    /// The generated answer.
    pub actual_answer: String,
    /// The ground-truth answer from the dataset.
    pub expected_answer: String,
}

/// A report that could not be answered, recorded by `run_isolated`.
#[derive(Debug, Clone, Serialize)]
pub struct ReportFailure {
    /// Position of the report in the input.
    pub position: usize,
    pub question: Option<String>,
    pub error: String,
}

/// Output of a batch that keeps going past failures.
#[derive(Debug, Clone, Default)]
pub struct BatchResults {
    pub predictions: Vec<PredictionRecord>,
    pub failures: Vec<ReportFailure>,
}

/// Runs the QA pipeline over reports, one fresh index per report.
pub struct BatchRunner {
    indexer: ReportIndexer,
    generator: Arc<dyn TextGenerator>,
    config: PipelineConfig,
    limit: Option<usize>,
}

impl BatchRunner {
    /// Create a new batch runner.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn TextGenerator>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            indexer: ReportIndexer::new(embedder),
            generator,
            config,
            limit: None,
        }
    }

    /// Only process the first `limit` reports.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    fn selected<'r>(&self, reports: &'r [Report]) -> &'r [Report] {
        match self.limit {
            Some(limit) => &reports[..limit.min(reports.len())],
            None => reports,
        }
    }

    /// Answer one report's question against an index built from that report alone.
    pub async fn run_report(&self, report: &Report) -> Result<PredictionRecord> {
        let qa = report.qa()?;
        let built = self.indexer.build_index(report).await?;

        let pipeline = QaPipeline::new(
            &built.index,
            &built.table_id,
            self.generator.as_ref(),
            &self.config,
        );
        let answer = pipeline.answer(&qa.question).await?;

        tracing::info!(
            question = %qa.question,
            actual = %answer,
            expected = %qa.answer,
            "answered report"
        );

        Ok(PredictionRecord {
            question: qa.question,
            actual_answer: answer,
            expected_answer: qa.answer,
        })
    }

    /// Answer every report in order. The first failure aborts the batch.
    pub async fn run(&self, reports: &[Report]) -> Result<Vec<PredictionRecord>> {
        let reports = self.selected(reports);
        let mut predictions = Vec::with_capacity(reports.len());

        for (position, report) in reports.iter().enumerate() {
            tracing::info!(report = position + 1, total = reports.len(), "running inference");
            predictions.push(self.run_report(report).await?);
        }

        Ok(predictions)
    }

    /// Answer every report in order, recording failures instead of aborting.
    pub async fn run_isolated(&self, reports: &[Report]) -> BatchResults {
        let reports = self.selected(reports);
        let mut results = BatchResults::default();

        for (position, report) in reports.iter().enumerate() {
            tracing::info!(report = position + 1, total = reports.len(), "running inference");
            match self.run_report(report).await {
                Ok(prediction) => results.predictions.push(prediction),
                Err(err) => {
                    tracing::warn!(report = position, error = %err, "report failed, continuing");
                    results.failures.push(ReportFailure {
                        position,
                        question: report.question(),
                        error: err.to_string(),
                    });
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;
    use crate::report::QaPair;
    use crate::testing::{FailingEmbedder, StubEmbedder, StubGenerator};

    fn report(question: &str, answer: &str) -> Report {
        Report::new(
            vec![format!("Context for {}", question)],
            vec![],
            vec![vec!["".into(), "2020".into()], vec!["Revenue".into(), "100".into()]],
            QaPair {
                question: question.into(),
                answer: answer.into(),
            },
        )
    }

    fn runner(generator: Arc<StubGenerator>) -> BatchRunner {
        BatchRunner::new(
            Arc::new(StubEmbedder::default()),
            generator,
            PipelineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_single_report() {
        let report = Report::new(
            vec!["Revenue grew 5%.".into()],
            vec![],
            vec![vec!["".into(), "2020".into()], vec!["Revenue".into(), "100".into()]],
            QaPair {
                question: "What was revenue?".into(),
                answer: "100".into(),
            },
        );
        let generator = Arc::new(StubGenerator::new("Revenue was 100 in 2020."));

        let predictions = runner(generator.clone()).run(&[report]).await.unwrap();

        assert_eq!(
            predictions,
            vec![PredictionRecord {
                question: "What was revenue?".into(),
                actual_answer: "Revenue was 100 in 2020.".into(),
                expected_answer: "100".into(),
            }]
        );
        // The rendered table reached the model.
        assert!(generator.prompts()[0].contains("Revenue  100"));
    }

    #[tokio::test]
    async fn test_output_order_matches_input() {
        let reports = vec![report("q1", "a1"), report("q2", "a2"), report("q3", "a3")];
        let generator = Arc::new(
            StubGenerator::new("unused")
                .then(Ok("g1".into()))
                .then(Ok("g2".into()))
                .then(Ok("g3".into())),
        );

        let predictions = runner(generator).run(&reports).await.unwrap();

        assert_eq!(predictions.len(), 3);
        for (i, prediction) in predictions.iter().enumerate() {
            assert_eq!(prediction.question, format!("q{}", i + 1));
            assert_eq!(prediction.actual_answer, format!("g{}", i + 1));
            assert_eq!(prediction.expected_answer, format!("a{}", i + 1));
        }
    }

    #[tokio::test]
    async fn test_each_report_sees_only_its_own_context() {
        let reports = vec![report("alpha", "1"), report("beta", "2")];
        let generator = Arc::new(StubGenerator::new("ok"));

        runner(generator.clone()).run(&reports).await.unwrap();

        let prompts = generator.prompts();
        assert!(prompts[0].contains("Context for alpha"));
        assert!(!prompts[0].contains("Context for beta"));
        assert!(prompts[1].contains("Context for beta"));
        assert!(!prompts[1].contains("Context for alpha"));
    }

    #[tokio::test]
    async fn test_failure_aborts_batch() {
        let mut broken = report("q2", "a2");
        broken.qa = None;
        let reports = vec![report("q1", "a1"), broken, report("q3", "a3")];
        let generator = Arc::new(StubGenerator::new("ok"));

        let result = runner(generator.clone()).run(&reports).await;

        assert!(matches!(result, Err(RagError::MissingField("qa_0"))));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_isolated_run_records_failures() {
        let mut broken = report("q2", "a2");
        broken.table = None;
        let reports = vec![report("q1", "a1"), broken, report("q3", "a3")];
        let generator = Arc::new(StubGenerator::new("ok"));

        let results = runner(generator).run_isolated(&reports).await;

        assert_eq!(results.predictions.len(), 2);
        assert_eq!(results.predictions[1].question, "q3");
        assert_eq!(results.failures.len(), 1);
        assert_eq!(results.failures[0].position, 1);
        assert_eq!(results.failures[0].question.as_deref(), Some("q2"));
        assert!(results.failures[0].error.contains("Index build failed"));
    }

    #[tokio::test]
    async fn test_isolated_run_records_incomplete_qa() {
        let reports = crate::report::parse_reports(
            r#"[
                {"pre_text": ["Revenue grew."], "post_text": [], "table": [["", 2020], ["Revenue", 100]],
                 "qa": {"question": "What was revenue?", "answer": 100}},
                {"pre_text": ["Costs fell."], "post_text": [], "table": [],
                 "qa": {"answer": "a"}}
            ]"#,
        )
        .unwrap();
        let generator = Arc::new(StubGenerator::new("100"));

        let results = runner(generator.clone()).run_isolated(&reports).await;

        assert_eq!(results.predictions.len(), 1);
        assert_eq!(results.predictions[0].expected_answer, "100");
        assert!(generator.prompts()[0].contains("Revenue  100"));
        assert_eq!(results.failures.len(), 1);
        assert_eq!(results.failures[0].position, 1);
        assert_eq!(results.failures[0].question, None);
        assert!(results.failures[0].error.contains("question"));
    }

    #[tokio::test]
    async fn test_embedding_outage_fails_fast() {
        let runner = BatchRunner::new(
            Arc::new(FailingEmbedder),
            Arc::new(StubGenerator::new("ok")),
            PipelineConfig::default(),
        );
        let result = runner.run(&[report("q", "a")]).await;
        assert!(matches!(result, Err(RagError::IndexBuild(_))));
    }

    #[tokio::test]
    async fn test_limit_truncates_batch() {
        let reports = vec![report("q1", "a1"), report("q2", "a2"), report("q3", "a3")];
        let predictions = runner(Arc::new(StubGenerator::new("ok")))
            .with_limit(Some(2))
            .run(&reports)
            .await
            .unwrap();
        assert_eq!(predictions.len(), 2);
    }
}
