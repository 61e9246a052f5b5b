//! Kitab - semantic book recommendations
//!
//! Describe the book you want to read; kitab finds catalog titles whose
//! descriptions are semantically close, optionally narrowed to a category
//! and re-ranked by emotional tone.
//!
//! # Example
//!
//! ```no_run
//! use kitab::{config::Config, present::Gallery, recommend::Query};
//!
//! let config = Config::default();
//! let recommender = kitab::init(&config, false)?;
//!
//! let query = Query::new("A dark story about revenge and justice", "All", "Suspenseful");
//! let gallery = Gallery::search(&recommender, &query, &config.display)?;
//! for tile in gallery.tiles() {
//!     println!("{}", tile.caption);
//! }
//! # Ok::<(), kitab::Error>(())
//! ```

pub mod catalog;
pub mod config;
pub mod embedding;
pub mod index;
pub mod present;
pub mod recommend;
pub mod web;

pub mod error;
pub use error::{Error, Result};

use std::sync::Arc;

/// Common types used throughout the library
pub mod types {
    /// Catalog identifier (ISBN-13 in the bundled dataset)
    pub type BookId = u64;

    /// Vector embedding (typically 384 dimensions for text)
    pub type Embedding = Vec<f32>;
}

/// Load the catalog, open or build the semantic index and wire them into a
/// [`recommend::Recommender`]
///
/// Any failure here is fatal: the recommender cannot serve without its data.
pub fn init(config: &config::Config, force_rebuild: bool) -> Result<recommend::Recommender> {
    init_with_progress(config, force_rebuild, None)
}

/// [`init`] with a progress bar advanced while descriptions are embedded
pub fn init_with_progress(
    config: &config::Config,
    force_rebuild: bool,
    progress: Option<&indicatif::ProgressBar>,
) -> Result<recommend::Recommender> {
    config.validate()?;

    let catalog = catalog::Catalog::load(&config.data.books_path, &config.display)?;
    let documents = index::load_tagged_descriptions(&config.data.descriptions_path)?;
    if let Some(pb) = progress {
        pb.set_length(documents.entries.len() as u64);
    }

    let embedder: Arc<dyn embedding::Embedder> = Arc::from(embedding::from_config(&config.model)?);
    let index = index::VectorIndex::open_or_build(
        &documents,
        embedder,
        &config.data.index_dir,
        force_rebuild,
        progress,
    )?;

    let untagged = documents
        .entries
        .iter()
        .filter(|entry| index::parse_candidate_id(entry).is_none())
        .count();
    if untagged > 0 {
        tracing::warn!(untagged, "Some descriptions do not start with a book identifier");
    }

    Ok(recommend::Recommender::new(Arc::new(catalog), Arc::new(index)))
}
