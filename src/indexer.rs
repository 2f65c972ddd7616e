//! Per-report index construction.
//!
//! Every report gets its own empty index: reports are unrelated documents and
//! retrieval must never cross between them. The index holds one passage per
//! narrative segment plus a single rendered table document.

use crate::document::IndexedDocument;
use crate::embeddings::Embedder;
use crate::error::{RagError, Result};
use crate::index::{InMemoryIndex, SimilarityIndex};
use crate::report::Report;
use crate::table::render_table;
use std::sync::Arc;

/// Stand-in content for a table with no cells. Embedding services reject empty inputs.
pub const EMPTY_TABLE_TEXT: &str = "(empty table)";

/// Stand-in content for a blank narrative segment.
pub const EMPTY_PASSAGE_TEXT: &str = "(empty passage)";

fn non_blank(text: String, placeholder: &str) -> String {
    if text.trim().is_empty() {
        placeholder.to_string()
    } else {
        text
    }
}

/// A freshly built index together with the id of its table document.
pub struct ReportIndex {
    pub index: InMemoryIndex,
    pub table_id: String,
}

/// Builds similarity indexes for reports.
pub struct ReportIndexer {
    embedder: Arc<dyn Embedder>,
}

impl ReportIndexer {
    /// Create a new report indexer.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Split a report into passage documents followed by the table document.
    pub fn documents(report: &Report) -> Result<Vec<IndexedDocument>> {
        let missing = |e: RagError| RagError::IndexBuild(e.to_string());
        let passages = report.passages().map_err(missing)?;
        let table = report.table().map_err(missing)?;
        let source = report.id.as_deref();

        let mut documents: Vec<IndexedDocument> = passages
            .into_iter()
            .map(|text| {
                IndexedDocument::passage(non_blank(text.to_string(), EMPTY_PASSAGE_TEXT), source)
            })
            .collect();
        documents.push(IndexedDocument::table(
            non_blank(render_table(&table), EMPTY_TABLE_TEXT),
            source,
        ));

        Ok(documents)
    }

    /// Build a fresh index for one report using a single embedding batch.
    pub async fn build_index(&self, report: &Report) -> Result<ReportIndex> {
        let documents = Self::documents(report)?;
        let table_id = documents
            .last()
            .map(|doc| doc.id.clone())
            .ok_or_else(|| RagError::IndexBuild("report produced no documents".to_string()))?;

        let mut index = InMemoryIndex::new(Arc::clone(&self.embedder));
        index.add_documents(documents).await?;

        tracing::debug!(documents = index.len(), report = ?report.id, "built report index");

        Ok(ReportIndex { index, table_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentKind;
    use crate::report::QaPair;
    use crate::testing::{FailingEmbedder, RecordingEmbedder, StubEmbedder};

    fn sample_report() -> Report {
        Report::new(
            vec!["Revenue grew 5%.".into(), "Costs were flat.".into()],
            vec!["Dividends rose.".into()],
            vec![
                vec!["".into(), "2020".into()],
                vec!["Revenue".into(), "100".into()],
            ],
            QaPair {
                question: "What was revenue?".into(),
                answer: "100".into(),
            },
        )
        .with_id("ACME/2020/page_12.pdf-1")
    }

    #[test]
    fn test_documents_layout() {
        let documents = ReportIndexer::documents(&sample_report()).unwrap();

        assert_eq!(documents.len(), 4);
        let contents: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(
            &contents[..3],
            &["Revenue grew 5%.", "Costs were flat.", "Dividends rose."]
        );
        assert_eq!(documents[3].kind, DocumentKind::Table);
        assert_eq!(documents[3].content, "         2020\n-------  ----\nRevenue  100");
        assert!(documents.iter().all(|d| d.metadata.source.as_deref() == Some("ACME/2020/page_12.pdf-1")));

        let mut ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[tokio::test]
    async fn test_build_index_holds_all_documents() {
        let indexer = ReportIndexer::new(Arc::new(StubEmbedder::default()));
        let built = indexer.build_index(&sample_report()).await.unwrap();

        assert_eq!(built.index.len(), 4);
        assert!(built.index.get_by_id(&built.table_id).unwrap().is_table());

        let kinds: Vec<DocumentKind> = built.index.documents().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DocumentKind::Passage,
                DocumentKind::Passage,
                DocumentKind::Passage,
                DocumentKind::Table
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_content_never_reaches_embedder() {
        let report = Report::new(
            vec!["Revenue grew 5%.".into(), "  ".into()],
            vec![],
            vec![],
            QaPair {
                question: "q".into(),
                answer: "a".into(),
            },
        );
        let embedder = Arc::new(RecordingEmbedder::default());
        let indexer = ReportIndexer::new(embedder.clone());

        let built = indexer.build_index(&report).await.unwrap();

        let inputs = embedder.inputs();
        assert_eq!(inputs.len(), 3);
        assert!(inputs.iter().all(|text| !text.trim().is_empty()));
        assert_eq!(inputs[1], EMPTY_PASSAGE_TEXT);
        assert_eq!(
            built.index.get_by_id(&built.table_id).unwrap().content,
            EMPTY_TABLE_TEXT
        );
    }

    #[tokio::test]
    async fn test_rebuild_gives_same_ranking() {
        let indexer = ReportIndexer::new(Arc::new(StubEmbedder::default()));
        let report = sample_report();

        let mut rankings = Vec::new();
        for _ in 0..2 {
            let built = indexer.build_index(&report).await.unwrap();
            let hits = built.index.similarity_search("What was revenue?", 3).await.unwrap();
            rankings.push(
                hits.into_iter()
                    .map(|hit| hit.document.content)
                    .collect::<Vec<_>>(),
            );
        }

        assert_eq!(rankings[0], rankings[1]);
    }

    #[tokio::test]
    async fn test_embedding_failure_fails_build() {
        let indexer = ReportIndexer::new(Arc::new(FailingEmbedder));
        let result = indexer.build_index(&sample_report()).await;
        assert!(matches!(result, Err(RagError::IndexBuild(_))));
    }

    #[tokio::test]
    async fn test_missing_table_fails_build() {
        let mut report = sample_report();
        report.table = None;

        let indexer = ReportIndexer::new(Arc::new(StubEmbedder::default()));
        let result = indexer.build_index(&report).await;
        assert!(matches!(result, Err(RagError::IndexBuild(msg)) if msg.contains("table")));
    }
}
