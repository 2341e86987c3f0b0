//! Error types for the embedding client

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for all embedding client operations.
///
/// Covers transport failures, non-success responses from the backend, and
/// responses whose shape cannot be interpreted. Dimension validation against
/// the vector index is deliberately the caller's concern; this crate only
/// reports what the backend returned.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// The backend answered with a non-success status.
    #[error("embedding backend returned status {status}: {detail}")]
    Backend { status: u16, detail: String },

    /// The backend was unreachable or the request timed out.
    #[error("embedding backend unreachable: {source}")]
    Transport {
        #[from]
        source: reqwest::Error,
    },

    /// The backend answered 2xx but the body was not usable.
    #[error("invalid embedding response: {detail}")]
    InvalidResponse { detail: String },
}

impl EmbedError {
    /// Create a backend error from a status code and response body.
    pub fn backend(status: u16, detail: impl Into<String>) -> Self {
        Self::Backend {
            status,
            detail: detail.into(),
        }
    }

    /// Create an invalid-response error with a descriptive message.
    pub fn invalid_response(detail: impl Into<String>) -> Self {
        Self::InvalidResponse {
            detail: detail.into(),
        }
    }
}
