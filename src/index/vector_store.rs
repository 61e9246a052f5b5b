//! Simple offline vector store for semantic search
//!
//! Uses a flat index with exact nearest neighbor search.
//! Fine for catalogs up to ~100k descriptions.

use crate::embedding::cosine_similarity;
use crate::types::Embedding;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What a persisted store was built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub embedder_key: String,
    pub source_hash: String,
    /// Unix timestamp of the build
    pub built_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    content: String,
    vector: Embedding,
}

/// Flat vector store; entries keep their insertion position
pub struct VectorStore {
    entries: Vec<StoredEntry>,
    /// Dimension of embeddings (e.g., 384 for all-MiniLM-L6-v2)
    dimension: usize,
}

impl VectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            entries: Vec::new(),
            dimension,
        }
    }

    /// Append an entry with its (normalized) embedding
    pub fn push(&mut self, content: String, embedding: Embedding) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(crate::Error::Embedding(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }

        self.entries.push(StoredEntry {
            content,
            vector: embedding,
        });
        Ok(())
    }

    /// Search for similar vectors using cosine similarity
    ///
    /// # Returns
    /// (position, similarity) pairs sorted by similarity descending; equal
    /// scores keep insertion order
    pub fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<(usize, f32)>> {
        if query_embedding.len() != self.dimension {
            return Err(crate::Error::Embedding(format!(
                "Query embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                query_embedding.len()
            )));
        }

        let mut scores: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (pos, cosine_similarity(query_embedding, &entry.vector)))
            .collect();

        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores.truncate(limit);

        Ok(scores)
    }

    /// Raw content of the entry at `position`
    pub fn content(&self, position: usize) -> Option<&str> {
        self.entries.get(position).map(|e| e.content.as_str())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Save the store and its manifest to disk
    pub fn save<P: AsRef<Path>>(&self, path: P, manifest: &IndexManifest) -> Result<()> {
        let data = VectorStoreRef {
            manifest,
            dimension: self.dimension,
            entries: &self.entries,
        };

        let json = serde_json::to_string(&data)?;
        fs::write(path, json)?;

        Ok(())
    }

    /// Load a store and its manifest from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<(Self, IndexManifest)> {
        let json = fs::read_to_string(path)?;
        let data: VectorStoreData = serde_json::from_str(&json)?;

        if let Some(bad) = data.entries.iter().find(|e| e.vector.len() != data.dimension) {
            return Err(crate::Error::SemanticIndex(format!(
                "corrupt vector store: entry has {} dimensions, expected {}",
                bad.vector.len(),
                data.dimension
            )));
        }

        Ok((
            Self {
                entries: data.entries,
                dimension: data.dimension,
            },
            data.manifest,
        ))
    }
}

#[derive(Serialize)]
struct VectorStoreRef<'a> {
    manifest: &'a IndexManifest,
    dimension: usize,
    entries: &'a [StoredEntry],
}

#[derive(Deserialize)]
struct VectorStoreData {
    manifest: IndexManifest,
    dimension: usize,
    entries: Vec<StoredEntry>,
}
