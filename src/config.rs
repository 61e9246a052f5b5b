//! Configuration management for kitab

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for kitab
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub model: ModelConfig,
    pub search: SearchConfig,
    pub display: DisplayConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Books table (CSV with emotion score columns)
    pub books_path: PathBuf,
    /// One tagged description per line, identifier first
    pub descriptions_path: PathBuf,
    /// Where the persisted vector index lives
    pub index_dir: PathBuf,
}

/// Which embedder backs the semantic index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    Onnx,
    Hash,
}

impl EmbedderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbedderKind::Onnx => "onnx",
            EmbedderKind::Hash => "hash",
        }
    }
}

impl std::str::FromStr for EmbedderKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "onnx" => Ok(EmbedderKind::Onnx),
            "hash" => Ok(EmbedderKind::Hash),
            other => Err(crate::Error::Config(format!(
                "unknown embedder '{}' (expected 'onnx' or 'hash')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub backend: EmbedderKind,
    /// ONNX model file; searched in the usual model directories when unset
    pub model_path: Option<PathBuf>,
    /// tokenizer.json; searched like `model_path` when unset
    pub tokenizer_path: Option<PathBuf>,
    /// Maximum token sequence length fed to the model
    pub max_length: usize,
    /// Output dimension of the hash embedder
    pub hash_dimension: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Candidates requested from the semantic index
    pub initial_k: usize,
    /// Results returned after filtering and re-ranking
    pub final_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub title_max_chars: usize,
    pub description_words: usize,
    /// Appended to real thumbnail URLs to request a larger cover
    pub thumbnail_suffix: String,
    /// Used when a book has no thumbnail or the thumbnail fails to load
    pub cover_placeholder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            books_path: PathBuf::from("books_with_emotions.csv"),
            descriptions_path: PathBuf::from("tagged_description.txt"),
            index_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".kitab"),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: EmbedderKind::Onnx,
            model_path: None,
            tokenizer_path: None,
            max_length: 256, // all-MiniLM-L6-v2 was trained on 256 tokens
            hash_dimension: 384,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            initial_k: 50,
            final_k: 16,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title_max_chars: 60,
            description_words: 30,
            thumbnail_suffix: "&fife=w800".to_string(),
            cover_placeholder: "/cover-not-found.svg".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 7860 }
    }
}

impl Config {
    /// Load configuration from a JSON file; absent fields keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| {
            crate::Error::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the recommender cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        if self.search.final_k == 0 {
            return Err(crate::Error::Config("search.final_k must be at least 1".into()));
        }
        if self.search.initial_k < self.search.final_k {
            return Err(crate::Error::Config(format!(
                "search.initial_k ({}) must not be smaller than search.final_k ({})",
                self.search.initial_k, self.search.final_k
            )));
        }
        if self.model.hash_dimension == 0 {
            return Err(crate::Error::Config("model.hash_dimension must be positive".into()));
        }
        Ok(())
    }
}
