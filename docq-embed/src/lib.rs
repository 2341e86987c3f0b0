//! # docq-embed
//!
//! Client library for turning text into fixed-dimension embedding vectors via
//! an external, Ollama-compatible embedding backend. Designed for async
//! operation behind a small provider trait so the retrieval pipeline does not
//! care which backend is serving the vectors.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docq_embed::{EmbedConfig, EmbeddingProvider, HttpEmbeddingClient};
//!
//! # async fn example() -> docq_embed::Result<()> {
//! let client = HttpEmbeddingClient::new(EmbedConfig::new("http://localhost:11434"))?;
//! let vector = client.embed_text("How do I treat a minor burn?").await?;
//! println!("embedding dimension: {}", vector.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Batch behavior
//!
//! [`EmbeddingProvider::embed_texts`] first attempts a true batch call. If the
//! backend rejects it (older servers only accept a single input), the client
//! falls back to sequential single calls; each item then succeeds or fails on
//! its own, so one bad item never discards the embeddings already produced.
//!
//! ## Modules
//!
//! - [`config`]: backend location, model name, declared dimension, timeouts
//! - [`client`]: the provider trait and the HTTP implementation
//! - [`error`]: error types and result handling

pub mod client;
pub mod config;
pub mod error;

pub use client::{EmbeddingProvider, HttpEmbeddingClient};
pub use config::EmbedConfig;
pub use error::{EmbedError, Result};
