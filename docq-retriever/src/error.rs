//! Error types for the retrieval pipeline.

use thiserror::Error;

/// Errors surfaced by query handling and corpus persistence.
///
/// Ingestion-side failures are handled with `anyhow` inside the
/// scheduler, since they are logged and retried rather than returned
/// to a caller. This enum covers the paths where the distinction
/// between a client mistake and a backend fault matters.
#[derive(Error, Debug)]
pub enum RetrieverError {
    /// The query text was empty or whitespace-only.
    #[error("query must not be empty")]
    EmptyQuery,

    /// An embedding did not match the index dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An upstream service (embedding, completion, extraction) failed.
    #[error("{service} backend error: {detail}")]
    Backend {
        service: &'static str,
        detail: String,
    },

    /// Writing the on-disk corpus artifacts failed. In-memory state
    /// stays ahead of disk until the next successful persist.
    #[error("failed to persist corpus state: {0}")]
    Persistence(#[from] std::io::Error),
}

impl RetrieverError {
    pub fn backend(service: &'static str, detail: impl Into<String>) -> Self {
        RetrieverError::Backend {
            service,
            detail: detail.into(),
        }
    }

    /// Whether the error is the caller's fault rather than the system's.
    pub fn is_client_error(&self) -> bool {
        matches!(self, RetrieverError::EmptyQuery)
    }
}

pub type Result<T> = std::result::Result<T, RetrieverError>;

impl From<docq_embed::EmbedError> for RetrieverError {
    fn from(err: docq_embed::EmbedError) -> Self {
        RetrieverError::backend("embedding", err.to_string())
    }
}
