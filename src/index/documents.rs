//! Tagged description source file
//!
//! One entry per line. The first whitespace-delimited token of each line is
//! the book identifier, the rest is the description that gets embedded.

use crate::Result;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Lines of the tagged description file plus a fingerprint of its bytes
#[derive(Debug, Clone)]
pub struct TaggedDocuments {
    pub entries: Vec<String>,
    /// SHA-256 of the raw file, hex encoded
    pub source_hash: String,
}

/// Read the tagged description file, one entry per non-blank line
pub fn load_tagged_descriptions(path: &Path) -> Result<TaggedDocuments> {
    let raw = fs::read_to_string(path).map_err(|e| {
        crate::Error::SemanticIndex(format!("failed to read {}: {}", path.display(), e))
    })?;

    let source_hash = compute_hash(raw.as_bytes());
    let entries = split_entries(&raw);

    tracing::debug!(entries = entries.len(), path = %path.display(), "Read tagged descriptions");
    Ok(TaggedDocuments {
        entries,
        source_hash,
    })
}

/// Split raw text into trimmed, non-blank lines
pub fn split_entries(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
