//! Completion client for an Ollama-compatible `/api/generate` endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RetrieverError};

/// Configuration for answer generation.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stop: Vec<String>,
    pub timeout: Duration,
}

impl CompletionConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            model: "llama3.2".to_string(),
            max_tokens: 512,
            temperature: 0.7,
            stop: vec!["</s>".to_string(), "\n\n".to_string()],
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions<'a>,
}

#[derive(Serialize)]
struct GenerateOptions<'a> {
    num_predict: u32,
    temperature: f32,
    stop: &'a [String],
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Non-streaming completion client.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    config: CompletionConfig,
    http: reqwest::Client,
}

impl CompletionClient {
    pub fn new(config: CompletionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RetrieverError::backend("completion", e.to_string()))?;
        Ok(Self { config, http })
    }

    /// Sends the prompt and returns the generated text.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(prompt_len = prompt.len(), model = %self.config.model, "requesting completion");
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: self.config.max_tokens,
                temperature: self.config.temperature,
                stop: &self.config.stop,
            },
        };

        let response = self
            .http
            .post(format!("{}/api/generate", self.config.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| RetrieverError::backend("completion", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RetrieverError::backend(
                "completion",
                format!("status {status}: {detail}"),
            ));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RetrieverError::backend("completion", e.to_string()))?;
        Ok(body.response)
    }
}
