//! Configuration for the embedding backend

use std::time::Duration;

/// Configuration for an Ollama-compatible embedding backend.
///
/// The declared `dimension` is the dimension the vector index is constructed
/// with; callers validate returned vectors against it rather than trusting
/// the backend.
#[derive(Debug, Clone)]
pub struct EmbedConfig {
    /// Base URL of the backend, e.g. `http://localhost:11434`.
    pub base_url: String,
    /// Model name passed through to the backend.
    pub model: String,
    /// Declared embedding dimension (768 for nomic-embed-text).
    pub dimension: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self::new("http://localhost:11434")
    }
}

impl EmbedConfig {
    /// Create a configuration for the backend at `base_url` with defaults for
    /// everything else (nomic-embed-text, 768 dimensions, 30 second timeout).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_trailing_slash(base_url.into()),
            model: "nomic-embed-text".to_string(),
            dimension: 768,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}
