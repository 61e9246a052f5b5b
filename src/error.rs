//! Error types for the kitab library

use thiserror::Error;

/// Result type alias for kitab operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for kitab
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Semantic index error: {0}")]
    SemanticIndex(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// Convert ort errors to our Error type
impl From<ort::Error> for Error {
    fn from(err: ort::Error) -> Self {
        Error::Embedding(err.to_string())
    }
}

impl From<ort::Error<ort::session::builder::SessionBuilder>> for Error {
    fn from(err: ort::Error<ort::session::builder::SessionBuilder>) -> Self {
        Error::Embedding(err.to_string())
    }
}

// Convert serde_json errors to our Error type
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Other(err.into())
    }
}

// Convert ndarray shape errors to our Error type
impl From<ndarray::ShapeError> for Error {
    fn from(err: ndarray::ShapeError) -> Self {
        Error::Embedding(err.to_string())
    }
}
