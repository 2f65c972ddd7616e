//! Text embedding backends.
//!
//! The pipeline only needs `text -> vector`; concrete backends are a hosted
//! OpenAI-compatible service and, behind the `local-embeddings` feature, a
//! sentence-transformers model run on the CPU.

#[cfg(feature = "local-embeddings")]
mod local;
mod openai;

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;
pub use openai::OpenAiEmbedder;

use crate::error::{RagError, Result};
use async_trait::async_trait;

/// Turns text into fixed-dimension vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts in one request. Output order matches input order.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text])
            .await?
            .pop()
            .ok_or_else(|| RagError::Embedding("no embedding returned for query".to_string()))
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
