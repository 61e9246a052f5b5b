//! Semantic index over tagged book descriptions
//!
//! The recommender only relies on [`SemanticIndex::similarity_search`]
//! returning raw entry content, most relevant first. [`VectorIndex`] is the
//! bundled implementation: an [`Embedder`] plus a flat [`VectorStore`],
//! persisted next to a manifest so unchanged sources are not re-embedded.

pub mod documents;
pub mod vector_store;

pub use documents::{load_tagged_descriptions, TaggedDocuments};
pub use vector_store::{IndexManifest, VectorStore};

use crate::embedding::Embedder;
use crate::types::BookId;
use crate::Result;
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// File name of the persisted index inside the index directory
pub const VECTORS_FILE: &str = "vectors.json";

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    /// Raw indexed text; begins with the book identifier
    pub content: String,
    pub score: f32,
}

/// Nearest-neighbour text search collaborator
pub trait SemanticIndex: Send + Sync {
    /// Up to `k` entries ordered by descending relevance
    fn similarity_search(&self, text: &str, k: usize) -> Result<Vec<IndexEntry>>;

    /// Number of indexed entries
    fn len(&self) -> usize;

    /// Short human-readable description of the backing model
    fn describe(&self) -> String {
        "semantic index".to_string()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Recover the book identifier an entry was tagged with
///
/// Surrounding quotes are stripped and the first whitespace-delimited token
/// is parsed. Returns `None` for content that does not start with an integer.
pub fn parse_candidate_id(content: &str) -> Option<BookId> {
    content
        .trim()
        .trim_matches('"')
        .split_whitespace()
        .next()?
        .parse()
        .ok()
}

/// Embedding-backed semantic index
pub struct VectorIndex {
    store: VectorStore,
    embedder: Arc<dyn Embedder>,
    manifest: IndexManifest,
}

impl VectorIndex {
    /// Embed every document and build a fresh index
    ///
    /// # Arguments
    /// * `documents` - Tagged description lines and their source fingerprint
    /// * `embedder` - Model used for both documents and queries
    /// * `progress` - Optional progress bar advanced once per document
    pub fn build(
        documents: &TaggedDocuments,
        embedder: Arc<dyn Embedder>,
        progress: Option<&ProgressBar>,
    ) -> Result<Self> {
        let vectors: Vec<_> = documents
            .entries
            .par_iter()
            .map(|entry| {
                let vector = embedder.embed(entry);
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                vector
            })
            .collect::<Result<_>>()?;

        let mut store = VectorStore::new(embedder.dimension());
        for (entry, vector) in documents.entries.iter().zip(vectors) {
            store.push(entry.clone(), vector)?;
        }

        let manifest = IndexManifest {
            embedder_key: embedder.key(),
            source_hash: documents.source_hash.clone(),
            built_at: chrono::Utc::now().timestamp(),
        };

        tracing::info!(
            entries = store.len(),
            embedder = %manifest.embedder_key,
            "Built semantic index"
        );

        Ok(Self {
            store,
            embedder,
            manifest,
        })
    }

    /// Reuse the persisted index in `index_dir` when it was built from the
    /// same source with the same embedder; otherwise build and persist anew
    pub fn open_or_build(
        documents: &TaggedDocuments,
        embedder: Arc<dyn Embedder>,
        index_dir: &Path,
        force_rebuild: bool,
        progress: Option<&ProgressBar>,
    ) -> Result<Self> {
        let vector_path = index_dir.join(VECTORS_FILE);

        if !force_rebuild && vector_path.exists() {
            match VectorStore::load(&vector_path) {
                Ok((store, manifest))
                    if manifest.embedder_key == embedder.key()
                        && manifest.source_hash == documents.source_hash
                        && store.dimension() == embedder.dimension() =>
                {
                    tracing::info!(
                        entries = store.len(),
                        path = %vector_path.display(),
                        "Loaded persisted semantic index"
                    );
                    return Ok(Self {
                        store,
                        embedder,
                        manifest,
                    });
                }
                Ok(_) => tracing::info!("Persisted semantic index is stale, rebuilding"),
                Err(e) => tracing::warn!(error = %e, "Failed to load persisted index, rebuilding"),
            }
        }

        let index = Self::build(documents, embedder, progress)?;
        std::fs::create_dir_all(index_dir)?;
        index.store.save(&vector_path, &index.manifest)?;
        tracing::debug!(path = %vector_path.display(), "Persisted semantic index");

        Ok(index)
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }
}

impl SemanticIndex for VectorIndex {
    fn similarity_search(&self, text: &str, k: usize) -> Result<Vec<IndexEntry>> {
        let query_embedding = self.embedder.embed(text)?;
        let hits = self.store.search(&query_embedding, k)?;

        Ok(hits
            .into_iter()
            .filter_map(|(pos, score)| {
                self.store.content(pos).map(|content| IndexEntry {
                    content: content.to_string(),
                    score,
                })
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.store.len()
    }

    fn describe(&self) -> String {
        self.manifest.embedder_key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use tempfile::TempDir;

    fn documents(lines: &[&str], hash: &str) -> TaggedDocuments {
        TaggedDocuments {
            entries: lines.iter().map(|l| l.to_string()).collect(),
            source_hash: hash.to_string(),
        }
    }

    fn library() -> TaggedDocuments {
        documents(
            &[
                "9780000000001 a brutal tale of revenge and justice in a lawless town",
                "9780000000002 starships drift through space on a grand adventure",
                "9780000000003 a gentle cookbook of french pastries and breads",
            ],
            "v1",
        )
    }

    #[test]
    fn test_parse_candidate_id() {
        assert_eq!(parse_candidate_id("9780002005883 A novel"), Some(9780002005883));
        assert_eq!(parse_candidate_id("\"9780002005883 A novel\""), Some(9780002005883));
        assert_eq!(parse_candidate_id("  9780002005883\tA novel"), Some(9780002005883));
        assert_eq!(parse_candidate_id("9780002005883"), Some(9780002005883));
    }

    #[test]
    fn test_parse_candidate_id_rejects_malformed() {
        assert_eq!(parse_candidate_id(""), None);
        assert_eq!(parse_candidate_id("   "), None);
        assert_eq!(parse_candidate_id("ISBN9780002005883 A novel"), None);
        assert_eq!(parse_candidate_id("978-0002005883 A novel"), None);
        assert_eq!(parse_candidate_id("-5 negative"), None);
    }

    #[test]
    fn test_vector_index_search() {
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(256));
        let index = VectorIndex::build(&library(), embedder, None).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.describe(), "hash-v1:256");

        let hits = index.similarity_search("space adventure", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(parse_candidate_id(&hits[0].content), Some(9780000000002));
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_open_or_build_reuses_matching_index() {
        let temp_dir = TempDir::new().unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(64));

        let first =
            VectorIndex::open_or_build(&library(), embedder.clone(), temp_dir.path(), false, None)
                .unwrap();
        assert!(temp_dir.path().join(VECTORS_FILE).exists());

        let second =
            VectorIndex::open_or_build(&library(), embedder, temp_dir.path(), false, None).unwrap();
        assert_eq!(second.manifest(), first.manifest());
        assert_eq!(second.len(), 3);
    }

    #[test]
    fn test_open_or_build_rebuilds_on_changed_source() {
        let temp_dir = TempDir::new().unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(64));

        VectorIndex::open_or_build(&library(), embedder.clone(), temp_dir.path(), false, None)
            .unwrap();

        let changed = documents(&["9780000000009 a single new entry"], "v2");
        let rebuilt =
            VectorIndex::open_or_build(&changed, embedder, temp_dir.path(), false, None).unwrap();
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt.manifest().source_hash, "v2");
    }

    #[test]
    fn test_open_or_build_rebuilds_on_changed_embedder() {
        let temp_dir = TempDir::new().unwrap();

        VectorIndex::open_or_build(
            &library(),
            Arc::new(HashEmbedder::new(64)),
            temp_dir.path(),
            false,
            None,
        )
        .unwrap();

        let rebuilt = VectorIndex::open_or_build(
            &library(),
            Arc::new(HashEmbedder::new(32)),
            temp_dir.path(),
            false,
            None,
        )
        .unwrap();
        assert_eq!(rebuilt.manifest().embedder_key, "hash-v1:32");
    }
}
