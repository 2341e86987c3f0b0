//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the ingestion scheduler and query engine.
///
/// Construct with [`RetrieverConfig::new`] and adjust with the
/// `with_*` builders:
///
/// ```
/// use docq_retriever::config::RetrieverConfig;
///
/// let config = RetrieverConfig::new("documents", "data")
///     .with_chunking(500, 50)
///     .with_top_k(5);
/// assert_eq!(config.dimension, 768);
/// ```
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Directory scanned for source documents.
    pub sources_dir: PathBuf,
    /// Directory holding the persisted corpus artifacts.
    pub data_dir: PathBuf,
    /// Embedding dimension; every vector in the index has this length.
    pub dimension: usize,
    /// Target chunk size in bytes.
    pub chunk_size: usize,
    /// Overlap carried between consecutive chunks.
    pub chunk_overlap: usize,
    /// Nearest neighbours requested per query.
    pub top_k: usize,
    /// Upper bound on chunks assembled into the completion context.
    pub max_context_chunks: usize,
    /// Delay between ingestion passes.
    pub poll_interval: Duration,
    /// Extracted text longer than this is truncated before chunking.
    pub max_text_len: usize,
}

impl RetrieverConfig {
    pub fn new(sources_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            sources_dir: sources_dir.into(),
            data_dir: data_dir.into(),
            dimension: 768,
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 5,
            max_context_chunks: 3,
            poll_interval: Duration::from_secs(30),
            max_text_len: 500_000,
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_chunking(mut self, chunk_size: usize, overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = overlap;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_max_context_chunks(mut self, max: usize) -> Self {
        self.max_context_chunks = max;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_text_len(mut self, max: usize) -> Self {
        self.max_text_len = max;
        self
    }

    /// Path of the binary vector index file.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("index.bin")
    }

    /// Path of the chunk metadata file, one JSON object per line.
    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("metadata.jsonl")
    }

    /// Path of the processed-sources ledger.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("processed_files.txt")
    }
}
