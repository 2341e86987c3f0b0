//! Polling ingestion scheduler.
//!
//! Each pass scans the sources directory for files the ledger does
//! not yet cover, extracts and chunks them, embeds the informative
//! chunks, and appends everything to the corpus in one batch. A
//! source that fails is skipped without a ledger entry, so the next
//! pass retries it. Backend calls happen without the corpus lock;
//! the lock is only taken for the final append-and-persist step.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use docq_chunk::{Chunk, TextSplitter, is_informative};
use docq_embed::EmbeddingProvider;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::RetrieverConfig;
use crate::extract::TextExtractor;
use crate::retrieval::corpus::SharedCorpus;
use crate::status::StatusHandle;

/// Extensions picked up by the scan.
const SOURCE_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "html", "htm"];

/// Outcome of one ingestion pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassStats {
    /// Unprocessed sources found by the scan.
    pub sources_found: usize,
    /// Sources fully ingested and added to the ledger.
    pub sources_processed: usize,
    /// Sources that failed and will be retried next pass.
    pub sources_skipped: usize,
    /// Chunks appended to the corpus.
    pub chunks_added: usize,
}

pub struct IngestionEngine {
    config: RetrieverConfig,
    corpus: SharedCorpus,
    status: StatusHandle,
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: TextExtractor,
    splitter: TextSplitter,
}

impl IngestionEngine {
    pub fn new(
        config: RetrieverConfig,
        corpus: SharedCorpus,
        status: StatusHandle,
        embedder: Arc<dyn EmbeddingProvider>,
        extractor: TextExtractor,
    ) -> Self {
        let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap);
        Self {
            config,
            corpus,
            status,
            embedder,
            extractor,
            splitter,
        }
    }

    /// Runs passes until `shutdown` flips to true, sleeping
    /// `poll_interval` between them. A failed pass is logged and the
    /// loop continues.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            sources_dir = %self.config.sources_dir.display(),
            interval_secs = self.config.poll_interval.as_secs(),
            "ingestion scheduler started"
        );
        loop {
            match self.run_once().await {
                Ok(stats) if stats.sources_found > 0 => {
                    info!(
                        processed = stats.sources_processed,
                        skipped = stats.sources_skipped,
                        chunks = stats.chunks_added,
                        "ingestion pass complete"
                    );
                }
                Ok(_) => debug!("ingestion pass found nothing new"),
                Err(e) => error!(error = %e, "ingestion pass failed"),
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
            if *shutdown.borrow() {
                break;
            }
        }
        info!("ingestion scheduler stopped");
    }

    /// Performs a single scan-extract-embed-persist pass.
    pub async fn run_once(&self) -> anyhow::Result<PassStats> {
        let pending = self.scan().await?;
        let mut stats = PassStats {
            sources_found: pending.len(),
            ..PassStats::default()
        };
        if pending.is_empty() {
            return Ok(stats);
        }

        self.status.begin_pass(pending.len()).await;
        let mut embeddings: Vec<Vec<f32>> = Vec::new();
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut completed: Vec<String> = Vec::new();

        for (path, rel) in pending {
            self.status.start_file(&rel).await;
            match self.process_source(&path, &rel).await {
                Ok(source_chunks) => {
                    stats.chunks_added += source_chunks.len();
                    for (vector, chunk) in source_chunks {
                        embeddings.push(vector);
                        chunks.push(chunk);
                    }
                    completed.push(rel);
                    stats.sources_processed += 1;
                }
                Err(e) => {
                    warn!(source = %rel, error = %e, "skipping source, will retry next pass");
                    stats.sources_skipped += 1;
                }
            }
            self.status.finish_file().await;
        }

        if !completed.is_empty() {
            if let Err(e) = self.corpus.append_batch(&embeddings, chunks, completed).await {
                // Memory now runs ahead of disk; the next successful
                // persist rewrites every artifact in full.
                error!(error = %e, "persisting ingestion results failed");
            }
        }
        self.status.end_pass().await;
        Ok(stats)
    }

    /// Walks the sources directory collecting files the ledger does
    /// not cover. Hidden files and directories are skipped, and the
    /// result is ordered by relative path.
    async fn scan(&self) -> anyhow::Result<Vec<(PathBuf, String)>> {
        let ledger = self.corpus.ledger_snapshot().await;
        let mut pending = Vec::new();
        let mut dirs = vec![self.config.sources_dir.clone()];

        while let Some(dir) = dirs.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .with_context(|| format!("reading {}", dir.display()))?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let name = entry.file_name();
                if name.to_string_lossy().starts_with('.') {
                    continue;
                }
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    dirs.push(path);
                    continue;
                }
                if !has_source_extension(&path) {
                    continue;
                }
                let rel = path
                    .strip_prefix(&self.config.sources_dir)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .replace('\\', "/");
                if !ledger.contains(&rel) {
                    pending.push((path, rel));
                }
            }
        }

        pending.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(pending)
    }

    /// Extracts, chunks, and embeds one source. Returns the embedded
    /// chunks; an error means the source stays unprocessed.
    async fn process_source(
        &self,
        path: &Path,
        rel: &str,
    ) -> anyhow::Result<Vec<(Vec<f32>, Chunk)>> {
        let mut text = self.load_text(path).await?;
        if text.len() > self.config.max_text_len {
            warn!(source = %rel, len = text.len(), "truncating oversized text");
            truncate_at_char_boundary(&mut text, self.config.max_text_len);
        }

        let pieces: Vec<String> = self
            .splitter
            .split(&text)
            .into_iter()
            .filter(|piece| is_informative(piece))
            .collect();
        if pieces.is_empty() {
            debug!(source = %rel, "no informative chunks");
            return Ok(Vec::new());
        }

        let expected_dim = self.config.dimension;
        let outcomes = self.embedder.embed_texts(&pieces).await;
        let mut embedded = Vec::with_capacity(pieces.len());
        let mut failed = 0usize;
        for (outcome, piece) in outcomes.into_iter().zip(pieces) {
            match outcome {
                Ok(vector) if vector.len() == expected_dim => {
                    embedded.push((
                        vector,
                        Chunk {
                            filename: rel.to_string(),
                            text: piece,
                        },
                    ));
                }
                Ok(vector) => {
                    anyhow::bail!(
                        "embedding dimension mismatch for {rel}: expected {expected_dim}, got {}",
                        vector.len()
                    );
                }
                Err(e) => {
                    warn!(source = %rel, error = %e, "dropping chunk that failed to embed");
                    failed += 1;
                }
            }
        }

        // When every chunk fails the backend is down, not the data;
        // leave the source for the next pass.
        anyhow::ensure!(
            !embedded.is_empty(),
            "all {failed} chunk embeddings failed for {rel}"
        );
        debug!(source = %rel, chunks = embedded.len(), failed, "embedded source");
        Ok(embedded)
    }

    async fn load_text(&self, path: &Path) -> anyhow::Result<String> {
        let text = if is_plain_text(path) {
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?
        } else {
            self.extractor.extract(path).await?
        };
        Ok(text.trim().to_string())
    }
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.as_str()))
}

fn is_plain_text(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref(),
        Some("txt") | Some("md")
    )
}

fn truncate_at_char_boundary(text: &mut String, max: usize) {
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}
