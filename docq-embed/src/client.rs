//! Embedding provider trait and HTTP implementation

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Trait for embedding providers that can generate embeddings from text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    ///
    /// Items succeed or fail independently: the result has one entry per
    /// input, in input order.
    async fn embed_texts(&self, texts: &[String]) -> Vec<Result<Vec<f32>>>;

    /// The dimension this provider is declared to produce
    fn embedding_dimension(&self) -> usize;

    /// The name/identifier of this provider
    fn provider_name(&self) -> &str;
}

/// Response body of the `/api/embed` endpoint: one vector per input.
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding provider backed by an Ollama-compatible HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingClient {
    config: EmbedConfig,
    http: reqwest::Client,
}

impl HttpEmbeddingClient {
    /// Build a client for the configured backend.
    ///
    /// The per-request timeout from the configuration is applied to every
    /// call so a stuck backend turns into an error instead of a hang.
    pub fn new(config: EmbedConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    /// Issue one `/api/embed` call with the given `input` value (a single
    /// string or an array of strings) and return the vectors.
    async fn request_embeddings(&self, input: serde_json::Value) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({
                "model": self.config.model,
                "input": input,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EmbedError::backend(status.as_u16(), detail));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::invalid_response(e.to_string()))?;
        if body.embeddings.is_empty() {
            return Err(EmbedError::invalid_response("no embeddings in response"));
        }
        Ok(body.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request_embeddings(json!(text)).await?;
        Ok(vectors.swap_remove(0))
    }

    async fn embed_texts(&self, texts: &[String]) -> Vec<Result<Vec<f32>>> {
        if texts.is_empty() {
            return Vec::new();
        }

        // Try a true batch call first.
        match self.request_embeddings(json!(texts)).await {
            Ok(vectors) if vectors.len() == texts.len() => {
                return vectors.into_iter().map(Ok).collect();
            }
            Ok(vectors) => {
                tracing::warn!(
                    expected = texts.len(),
                    got = vectors.len(),
                    "batch embedding returned wrong count, falling back to single calls"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "batch embedding failed, falling back to single calls");
            }
        }

        // Sequential fallback: each item surfaces its own error without
        // aborting the others.
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed_text(text).await);
        }
        results
    }

    fn embedding_dimension(&self) -> usize {
        self.config.dimension
    }

    fn provider_name(&self) -> &str {
        "ollama-http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> HttpEmbeddingClient {
        HttpEmbeddingClient::new(EmbedConfig::new(server.base_url()).with_dimension(3)).unwrap()
    }

    #[tokio::test]
    async fn embed_text_returns_vector() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .body_contains(r#""input":"hello""#);
                then.status(200)
                    .json_body(serde_json::json!({"embeddings": [[0.1, 0.2, 0.3]]}));
            })
            .await;

        let client = client_for(&server);
        let vector = client.embed_text("hello").await.unwrap();

        mock.assert_async().await;
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        assert_eq!(client.embedding_dimension(), 3);
    }

    #[tokio::test]
    async fn non_success_status_surfaces_as_backend_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(500).body("model not loaded");
            })
            .await;

        let client = client_for(&server);
        let err = client.embed_text("hello").await.unwrap_err();

        match err {
            EmbedError::Backend { status, detail } => {
                assert_eq!(status, 500);
                assert_eq!(detail, "model not loaded");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn batch_call_is_used_when_backend_supports_it() {
        let server = MockServer::start_async().await;
        let batch = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .body_contains(r#""input":["#);
                then.status(200).json_body(
                    serde_json::json!({"embeddings": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]}),
                );
            })
            .await;

        let client = client_for(&server);
        let texts = vec!["one".to_string(), "two".to_string()];
        let results = client.embed_texts(&texts).await;

        batch.assert_async().await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), &vec![1.0, 0.0, 0.0]);
        assert_eq!(results[1].as_ref().unwrap(), &vec![0.0, 1.0, 0.0]);
    }

    #[tokio::test]
    async fn batch_failure_falls_back_to_per_item_calls() {
        let server = MockServer::start_async().await;
        // Older backends reject array input outright.
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .body_contains(r#""input":["#);
                then.status(400).body("input must be a string");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .body_contains(r#""input":"good""#);
                then.status(200)
                    .json_body(serde_json::json!({"embeddings": [[0.5, 0.5, 0.5]]}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .body_contains(r#""input":"bad""#);
                then.status(500).body("boom");
            })
            .await;

        let client = client_for(&server);
        let texts = vec!["good".to_string(), "bad".to_string()];
        let results = client.embed_texts(&texts).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1].as_ref().unwrap_err(),
            EmbedError::Backend { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn empty_batch_makes_no_calls() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(200);
            })
            .await;

        let client = client_for(&server);
        let results = client.embed_texts(&[]).await;

        assert!(results.is_empty());
        mock.assert_hits_async(0).await;
    }
}
