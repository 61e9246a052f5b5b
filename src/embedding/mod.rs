//! Text embedding backends for the semantic index

pub mod hashing;
pub mod tokenizer;

pub use hashing::HashEmbedder;

use crate::config::{EmbedderKind, ModelConfig};
use crate::types::Embedding;
use crate::Result;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tokenizer::Tokenizer;

/// Turns text into a fixed-size, L2-normalized vector
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model; persisted indexes built with a
    /// different key are rebuilt
    fn key(&self) -> String;

    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Embedding>;
}

/// Build the embedder selected by the model configuration
pub fn from_config(config: &ModelConfig) -> Result<Box<dyn Embedder>> {
    match config.backend {
        EmbedderKind::Hash => Ok(Box::new(HashEmbedder::new(config.hash_dimension))),
        EmbedderKind::Onnx => {
            let model_path = config
                .model_path
                .clone()
                .or_else(|| find_model_path("model.onnx"))
                .ok_or_else(|| {
                    crate::Error::Embedding(
                        "ONNX model not found in ./models, ../models or ~/.kitab/models. \
                         Download with: curl -L -o models/model.onnx \
                         https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx"
                            .to_string(),
                    )
                })?;
            let tokenizer_path = config
                .tokenizer_path
                .clone()
                .or_else(|| find_model_path("tokenizer.json"))
                .ok_or_else(|| crate::Error::Embedding("tokenizer.json not found".to_string()))?;

            tracing::info!(model = %model_path.display(), "Loading ONNX embedding model");
            Ok(Box::new(OnnxEmbedder::new(
                &model_path,
                &tokenizer_path,
                config.max_length,
            )?))
        }
    }
}

/// Find a model file in common locations
pub fn find_model_path(filename: &str) -> Option<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()));

    let mut possible_paths = vec![
        // Current directory
        Some(PathBuf::from("models").join(filename)),
        // Project directory (if running from subdirectory)
        Some(PathBuf::from("../models").join(filename)),
        // Home directory
        dirs::home_dir().map(|h| h.join(".kitab/models").join(filename)),
    ];

    if let Some(ref d) = exe_dir {
        possible_paths.push(Some(d.join("models").join(filename)));
        possible_paths.push(d.parent().map(|p| p.join("models").join(filename)));
    }

    possible_paths.into_iter().flatten().find(|path| path.exists())
}

/// Sentence-transformer model (all-MiniLM-L6-v2) run through ONNX Runtime
/// Process-wide ONNX Runtime environment; ort allows only one per process
fn ort_environment() -> Result<&'static ort::environment::Environment> {
    static ENV: OnceLock<ort::environment::Environment> = OnceLock::new();
    static INIT: Mutex<()> = Mutex::new(());
    if let Some(env) = ENV.get() {
        return Ok(env);
    }
    let _guard = INIT.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(env) = ENV.get() {
        return Ok(env);
    }
    let env = ort::init().build()?;
    Ok(ENV.get_or_init(|| env))
}

pub struct EmbeddingModel {
    session: Session,
    tokenizer: Tokenizer,
    max_length: usize,
}

impl EmbeddingModel {
    /// Create a new embedding model
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `tokenizer_path` - Path to tokenizer.json
    /// * `max_length` - Sequence length inputs are truncated/padded to
    pub fn new(model_path: &Path, tokenizer_path: &Path, max_length: usize) -> Result<Self> {
        let model_bytes = std::fs::read(model_path)?;

        let session = Session::builder(ort_environment()?)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_memory(&model_bytes)?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)?;

        Ok(Self {
            session,
            tokenizer,
            max_length,
        })
    }

    /// Generate a normalized embedding for a text string
    pub fn embed(&mut self, text: &str) -> Result<Embedding> {
        let tokens = self.tokenizer.encode(text, self.max_length)?;

        // ort 2.0 expects (shape, data) tuples
        let seq_len = tokens.input_ids.len();
        let shape = vec![1, seq_len];

        let input_ids_value = Value::from_array((shape.clone(), tokens.input_ids.clone()))?;
        let attention_mask_value = Value::from_array((shape.clone(), tokens.attention_mask.clone()))?;
        let token_type_ids_value = Value::from_array((shape.clone(), tokens.token_type_ids.clone()))?;

        let outputs = self.session.run(ort::inputs![
            "input_ids" => input_ids_value,
            "attention_mask" => attention_mask_value,
            "token_type_ids" => token_type_ids_value,
        ])?;

        // Output shape: [batch_size, sequence_length, hidden_size]
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let hidden = ndarray::ArrayView3::from_shape(
            (shape[0] as usize, shape[1] as usize, shape[2] as usize),
            data,
        )?
        .to_owned();

        drop(outputs);

        let pooled = mean_pool(&hidden, &tokens.attention_mask)?;
        Ok(normalize(&pooled))
    }
}

/// [`EmbeddingModel`] behind a lock, since inference needs `&mut`
pub struct OnnxEmbedder {
    model: Mutex<EmbeddingModel>,
    key: String,
    dimension: usize,
}

impl OnnxEmbedder {
    pub fn new(model_path: &Path, tokenizer_path: &Path, max_length: usize) -> Result<Self> {
        let mut model = EmbeddingModel::new(model_path, tokenizer_path, max_length)?;

        // Probe the output width instead of assuming 384
        let dimension = model.embed("dimension probe")?.len();
        let name = model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("model");

        Ok(Self {
            model: Mutex::new(model),
            key: format!("onnx:{}:{}:{}", name, dimension, max_length),
            dimension,
        })
    }
}

impl Embedder for OnnxEmbedder {
    fn key(&self) -> String {
        self.key.clone()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut model = self.model.lock().map_err(|e| {
            crate::Error::Embedding(format!("Failed to acquire model lock: {}", e))
        })?;
        model.embed(text)
    }
}

/// Mean pooling over sequence dimension with attention mask
fn mean_pool(embeddings: &ndarray::Array3<f32>, attention_mask: &[i64]) -> Result<Vec<f32>> {
    let batch_size = embeddings.shape()[0];
    let seq_len = embeddings.shape()[1];
    let hidden_size = embeddings.shape()[2];

    if batch_size != 1 {
        return Err(crate::Error::Embedding(format!(
            "expected batch size 1, got {}",
            batch_size
        )));
    }

    let mut pooled = vec![0.0f32; hidden_size];
    let mut mask_sum = 0i64;

    for (i, &mask_value) in attention_mask.iter().enumerate().take(seq_len) {
        mask_sum += mask_value;

        if mask_value > 0 {
            for (j, slot) in pooled.iter_mut().enumerate() {
                *slot += embeddings[[0, i, j]] * mask_value as f32;
            }
        }
    }

    if mask_sum > 0 {
        for val in &mut pooled {
            *val /= mask_sum as f32;
        }
    }

    Ok(pooled)
}

/// L2 normalize an embedding vector
pub fn normalize(embedding: &[f32]) -> Vec<f32> {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm > 0.0 {
        embedding.iter().map(|x| x / norm).collect()
    } else {
        embedding.to_vec()
    }
}

/// Cosine similarity of two normalized embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Embeddings must have same dimension");

    // For normalized vectors this is just the dot product
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
