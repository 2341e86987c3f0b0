//! Ingestion progress tracking shared between the scheduler and queries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Snapshot of the scheduler's progress through the current pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionStatus {
    /// True while a pass is running.
    pub in_progress: bool,
    /// Number of unprocessed sources found by the current pass.
    pub total_files: usize,
    /// Sources the current pass has finished with (processed or skipped).
    pub files_processed: usize,
    /// Relative path of the source being worked on, if any.
    pub current_file: Option<String>,
    /// When the current pass started.
    pub start_time: Option<DateTime<Utc>>,
    /// Last time any field changed.
    pub last_update: Option<DateTime<Utc>>,
}

impl IngestionStatus {
    /// Percentage of the current pass completed, 0 when no pass is active.
    pub fn progress_percent(&self) -> u32 {
        if self.total_files == 0 {
            return 0;
        }
        (self.files_processed * 100 / self.total_files) as u32
    }
}

/// Top-level status report: corpus size plus ingestion progress.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub documents_indexed: usize,
    pub progress_percent: u32,
    pub ingestion: IngestionStatus,
}

/// Cheap clonable handle to the shared status.
#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    inner: Arc<RwLock<IngestionStatus>>,
}

impl StatusHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> IngestionStatus {
        self.inner.read().await.clone()
    }

    /// Marks the start of a pass over `total` unprocessed sources.
    pub async fn begin_pass(&self, total: usize) {
        let mut status = self.inner.write().await;
        let now = Utc::now();
        status.in_progress = true;
        status.total_files = total;
        status.files_processed = 0;
        status.current_file = None;
        status.start_time = Some(now);
        status.last_update = Some(now);
    }

    pub async fn start_file(&self, name: &str) {
        let mut status = self.inner.write().await;
        status.current_file = Some(name.to_string());
        status.last_update = Some(Utc::now());
    }

    pub async fn finish_file(&self) {
        let mut status = self.inner.write().await;
        status.files_processed += 1;
        status.current_file = None;
        status.last_update = Some(Utc::now());
    }

    pub async fn end_pass(&self) {
        let mut status = self.inner.write().await;
        status.in_progress = false;
        status.current_file = None;
        status.last_update = Some(Utc::now());
    }
}
