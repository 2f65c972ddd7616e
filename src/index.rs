//! In-memory similarity index over embedded documents.

use crate::document::IndexedDocument;
use crate::embeddings::{Embedder, cosine_similarity};
use crate::error::{RagError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// A document returned by similarity search.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: IndexedDocument,
    /// Cosine similarity to the query.
    pub score: f32,
}

/// Nearest-neighbour lookup plus exact lookup by identifier.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Embed and insert documents. Either all are inserted or none are.
    async fn add_documents(&mut self, documents: Vec<IndexedDocument>) -> Result<()>;

    /// Up to `k` documents, most similar first.
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>>;

    /// Exact lookup by document id.
    fn get_by_id(&self, id: &str) -> Option<&IndexedDocument>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A vector index entry.
#[derive(Debug, Clone)]
struct IndexEntry {
    document: IndexedDocument,
    embedding: Vec<f32>,
}

/// Brute-force cosine index held in memory.
pub struct InMemoryIndex {
    embedder: Arc<dyn Embedder>,
    entries: Vec<IndexEntry>,
    /// Position of each document in `entries`, keyed by id.
    by_id: HashMap<String, usize>,
}

impl InMemoryIndex {
    /// Create a new empty index.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// All documents in insertion order.
    pub fn documents(&self) -> impl Iterator<Item = &IndexedDocument> {
        self.entries.iter().map(|entry| &entry.document)
    }
}

#[async_trait]
impl SimilarityIndex for InMemoryIndex {
    async fn add_documents(&mut self, documents: Vec<IndexedDocument>) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
        let embeddings = self
            .embedder
            .embed_documents(&texts)
            .await
            .map_err(|e| RagError::IndexBuild(e.to_string()))?;

        if embeddings.len() != documents.len() {
            return Err(RagError::IndexBuild(format!(
                "embedder returned {} vectors for {} documents",
                embeddings.len(),
                documents.len()
            )));
        }

        for (document, embedding) in documents.into_iter().zip(embeddings) {
            self.by_id.insert(document.id.clone(), self.entries.len());
            self.entries.push(IndexEntry {
                document,
                embedding,
            });
        }

        Ok(())
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed_query(query)
            .await
            .map_err(|e| RagError::Retrieval(e.to_string()))?;

        let mut results: Vec<ScoredDocument> = self
            .entries
            .iter()
            .map(|entry| ScoredDocument {
                document: entry.document.clone(),
                score: cosine_similarity(&query_embedding, &entry.embedding),
            })
            .collect();

        // Stable sort: equal scores keep insertion order.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);

        Ok(results)
    }

    fn get_by_id(&self, id: &str) -> Option<&IndexedDocument> {
        self.by_id.get(id).map(|&pos| &self.entries[pos].document)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
