//! Shared corpus state: vector index, chunk metadata, and the
//! processed-sources ledger behind one async lock.
//!
//! The three structures move together. A chunk's position in the
//! index is the line number of its metadata record, and a source
//! appears in the ledger only once all of its chunks are stored.
//! [`SharedCorpus`] exposes operations that each take the lock for
//! the shortest possible span; callers never hold it across backend
//! calls.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use docq_chunk::Chunk;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::RetrieverConfig;
use crate::error::Result;
use crate::retrieval::vector_index::FlatIndex;

struct CorpusState {
    index: FlatIndex,
    docs: Vec<Chunk>,
    ledger: HashSet<String>,
    index_path: PathBuf,
    metadata_path: PathBuf,
    ledger_path: PathBuf,
}

impl CorpusState {
    /// Rewrites all three artifacts, index first so that a crash
    /// between writes never leaves metadata claiming vectors that
    /// were not stored.
    async fn persist(&self) -> Result<()> {
        self.index.save(&self.index_path).await?;

        let mut lines = String::new();
        for chunk in &self.docs {
            // Chunk serialization is infallible; the struct is two strings.
            lines.push_str(&serde_json::to_string(chunk).map_err(std::io::Error::other)?);
            lines.push('\n');
        }
        tokio::fs::write(&self.metadata_path, lines).await?;

        let mut sources: Vec<&str> = self.ledger.iter().map(String::as_str).collect();
        sources.sort_unstable();
        let mut ledger = sources.join("\n");
        if !ledger.is_empty() {
            ledger.push('\n');
        }
        tokio::fs::write(&self.ledger_path, ledger).await?;
        Ok(())
    }
}

/// Clonable handle to the corpus, safe to share between the
/// ingestion scheduler and any number of concurrent queries.
#[derive(Clone)]
pub struct SharedCorpus {
    inner: Arc<Mutex<CorpusState>>,
}

impl SharedCorpus {
    /// Opens the corpus from `config.data_dir`, creating the
    /// directory and starting empty when no artifacts exist yet.
    pub async fn open(config: &RetrieverConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;

        let index_path = config.index_path();
        let index = if index_path.exists() {
            let index = FlatIndex::load(&index_path)
                .await
                .with_context(|| format!("loading {}", index_path.display()))?;
            anyhow::ensure!(
                index.dimension() == config.dimension,
                "index dimension {} does not match configured dimension {}",
                index.dimension(),
                config.dimension
            );
            index
        } else {
            FlatIndex::new(config.dimension)
        };

        let metadata_path = config.metadata_path();
        let docs = if metadata_path.exists() {
            load_metadata(&metadata_path).await?
        } else {
            Vec::new()
        };
        anyhow::ensure!(
            docs.len() == index.count(),
            "metadata has {} records but index holds {} vectors",
            docs.len(),
            index.count()
        );

        let ledger_path = config.ledger_path();
        let ledger = if ledger_path.exists() {
            load_ledger(&ledger_path).await?
        } else {
            HashSet::new()
        };

        info!(
            chunks = index.count(),
            sources = ledger.len(),
            data_dir = %config.data_dir.display(),
            "opened corpus"
        );
        Ok(Self {
            inner: Arc::new(Mutex::new(CorpusState {
                index,
                docs,
                ledger,
                index_path,
                metadata_path,
                ledger_path,
            })),
        })
    }

    /// Appends one ingestion pass worth of results and persists all
    /// three artifacts before releasing the lock. `embeddings` and
    /// `chunks` must be parallel; `completed` lists the sources to
    /// mark processed.
    pub async fn append_batch(
        &self,
        embeddings: &[Vec<f32>],
        chunks: Vec<Chunk>,
        completed: Vec<String>,
    ) -> Result<()> {
        debug_assert_eq!(embeddings.len(), chunks.len());
        let mut state = self.inner.lock().await;
        state.index.add(embeddings)?;
        state.docs.extend(chunks);
        state.ledger.extend(completed);
        state.persist().await?;
        debug!(total_chunks = state.index.count(), "appended batch");
        Ok(())
    }

    /// Brute-force nearest-neighbour search; see
    /// [`FlatIndex::search`] for the result shape.
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<(f32, i64)>> {
        let state = self.inner.lock().await;
        state.index.search(query, k)
    }

    /// Resolves index positions to chunks, silently dropping
    /// sentinels and out-of-range positions.
    pub async fn chunks_at(&self, positions: &[i64]) -> Vec<Chunk> {
        let state = self.inner.lock().await;
        positions
            .iter()
            .filter_map(|&pos| usize::try_from(pos).ok())
            .filter_map(|pos| state.docs.get(pos).cloned())
            .collect()
    }

    pub async fn chunk_count(&self) -> usize {
        self.inner.lock().await.index.count()
    }

    pub async fn dimension(&self) -> usize {
        self.inner.lock().await.index.dimension()
    }

    /// Copy of the processed-sources set, used by the scheduler to
    /// scan without holding the corpus lock.
    pub async fn ledger_snapshot(&self) -> HashSet<String> {
        self.inner.lock().await.ledger.clone()
    }
}

async fn load_metadata(path: &Path) -> anyhow::Result<Vec<Chunk>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let mut docs = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let chunk: Chunk = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: bad metadata record", path.display(), lineno + 1))?;
        docs.push(chunk);
    }
    Ok(docs)
}

async fn load_ledger(path: &Path) -> anyhow::Result<HashSet<String>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
