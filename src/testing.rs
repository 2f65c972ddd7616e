//! Deterministic stand-ins for the hosted services, shared by unit tests.

use crate::embeddings::Embedder;
use crate::error::{RagError, Result};
use crate::llm::TextGenerator;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Bag-of-words embedder: each lowercase alphanumeric token adds one to a hashed bucket.
pub struct StubEmbedder {
    dimension: usize,
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self { dimension: 256 }
    }
}

/// FNV-1a, so bucket assignment is stable across runs and platforms.
fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

impl StubEmbedder {
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = (fnv1a(&token.to_lowercase()) % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }
}

/// Stub embedder that records every text sent for embedding.
#[derive(Default)]
pub struct RecordingEmbedder {
    inner: StubEmbedder,
    inputs: Mutex<Vec<String>>,
}

impl RecordingEmbedder {
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Embedder for RecordingEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.inputs
            .lock()
            .unwrap()
            .extend(texts.iter().map(|t| t.to_string()));
        self.inner.embed_documents(texts).await
    }
}

/// Embedder whose service is always unreachable.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed_documents(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Err(RagError::Http("connection refused".to_string()))
    }
}

/// Generator that replays queued responses and records every prompt it sees.
///
/// Once the queue is empty it keeps returning the fallback response.
pub struct StubGenerator {
    queued: Mutex<VecDeque<Result<String>>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: fallback.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, response: Result<String>) -> Self {
        self.queued.lock().unwrap().push_back(response);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, _system: Option<&str>, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.queued.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(self.fallback.clone()),
        }
    }
}
