//! Local embedding model using candle + sentence-transformers.

use super::Embedder;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use tokenizers::Tokenizer;

/// Default model for offline runs.
pub const MINILM_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

fn embedding_error(context: &str, err: impl std::fmt::Display) -> RagError {
    RagError::Embedding(format!("{}: {}", context, err))
}

/// Sentence-transformers model evaluated on the CPU.
pub struct LocalEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    normalize: bool,
}

impl LocalEmbedder {
    /// Load the all-MiniLM-L6-v2 model from Hugging Face Hub.
    pub fn load_minilm() -> Result<Self> {
        Self::load(MINILM_MODEL_ID)
    }

    /// Load a sentence-transformers model by name.
    pub fn load(model_id: &str) -> Result<Self> {
        let device = Device::Cpu;

        let api = Api::new().map_err(|e| embedding_error("failed to create HF Hub API", e))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .map_err(|e| embedding_error("failed to get config.json", e))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| embedding_error("failed to get tokenizer.json", e))?;
        let weights_path = repo
            .get("model.safetensors")
            .or_else(|_| repo.get("pytorch_model.bin"))
            .map_err(|e| embedding_error("failed to get model weights", e))?;

        let raw_config =
            std::fs::read_to_string(&config_path).map_err(|e| RagError::io(&config_path, e))?;
        let config: BertConfig = serde_json::from_str(&raw_config)
            .map_err(|e| embedding_error("failed to parse model config", e))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| embedding_error("failed to load tokenizer", e))?;

        // SAFETY: the weights file is owned by the hub cache and not mutated while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .map_err(|e| embedding_error("failed to load model weights", e))?
        };

        let model =
            BertModel::load(vb, &config).map_err(|e| embedding_error("failed to load BERT model", e))?;

        tracing::info!(model = model_id, "loaded local embedding model");

        Ok(Self {
            model,
            tokenizer,
            device,
            normalize: true,
        })
    }

    /// Mean-pooled, L2-normalised embeddings for a batch of texts.
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.forward(texts)
            .map_err(|e| embedding_error("local inference failed", e))
    }

    fn forward(&self, texts: &[&str]) -> candle_core::Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| candle_core::Error::Msg(format!("tokenization failed: {}", e)))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids_vec = Vec::new();
        let mut attention_mask_vec = Vec::new();
        let mut token_type_ids_vec = Vec::new();

        for encoding in &encodings {
            let mut padded_ids = encoding.get_ids().to_vec();
            let mut padded_mask = encoding.get_attention_mask().to_vec();

            padded_ids.resize(max_len, 0);
            padded_mask.resize(max_len, 0);

            input_ids_vec.extend(padded_ids);
            attention_mask_vec.extend(padded_mask);
            token_type_ids_vec.extend(std::iter::repeat_n(0u32, max_len));
        }

        let batch_size = texts.len();
        let input_ids = Tensor::from_vec(input_ids_vec, (batch_size, max_len), &self.device)?;
        let attention_mask =
            Tensor::from_vec(attention_mask_vec, (batch_size, max_len), &self.device)?;
        let token_type_ids =
            Tensor::from_vec(token_type_ids_vec, (batch_size, max_len), &self.device)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = mean_pool(&output, &attention_mask)?;
        let pooled = if self.normalize {
            l2_normalize(&pooled)?
        } else {
            pooled
        };

        pooled.to_vec2::<f32>()
    }
}

/// Average token vectors over the sequence dimension, ignoring padding.
///
/// `hidden` is `(batch, seq, dim)`, `attention_mask` is `(batch, seq)`.
fn mean_pool(hidden: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask = attention_mask
        .unsqueeze(2)?
        .to_dtype(hidden.dtype())?
        .broadcast_as(hidden.shape())?;
    let summed = (hidden * &mask)?.sum(1)?;
    let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
    summed / counts
}

/// Scale each row to unit length.
fn l2_normalize(vectors: &Tensor) -> candle_core::Result<Tensor> {
    let norms = vectors.sqr()?.sum_keepdim(1)?.sqrt()?;
    vectors.broadcast_div(&norms)
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.embed_batch(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool_skips_padding() {
        let hidden = Tensor::new(
            &[[[1f32, 2.0], [3.0, 4.0], [100.0, 100.0]]],
            &Device::Cpu,
        )
        .unwrap();
        let mask = Tensor::new(&[[1u32, 1, 0]], &Device::Cpu).unwrap();

        let pooled = mean_pool(&hidden, &mask).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(pooled, vec![vec![2.0, 3.0]]);
    }

    #[test]
    fn test_l2_normalize_rows() {
        let vectors = Tensor::new(&[[3f32, 4.0], [0.0, 2.0]], &Device::Cpu).unwrap();

        let normalized = l2_normalize(&vectors).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(normalized, vec![vec![0.6, 0.8], vec![0.0, 1.0]]);
    }
}
