//! Error types for the benchmark harness.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BenchError>;

/// Unified error type covering both backend drivers and harness-local
/// failures.
///
/// Query-execution failures are wrapped driver errors and propagate to the
/// caller untouched; there is no retry policy anywhere in the harness.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("relational backend error: {0}")]
    Relational(#[from] postgres::Error),

    #[error("document backend error: {0}")]
    Document(#[from] mongodb::error::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed document: {0}")]
    Malformed(#[from] mongodb::bson::document::ValueAccessError),
}

impl From<serde_json::Error> for BenchError {
    fn from(e: serde_json::Error) -> Self {
        BenchError::Config(e.to_string())
    }
}
