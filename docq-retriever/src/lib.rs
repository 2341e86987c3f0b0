//! Incremental document retrieval pipeline.
//!
//! A polling scheduler watches a sources directory, extracts and
//! chunks new documents, embeds the chunks through an HTTP backend,
//! and stores them in a flat vector index persisted next to its
//! chunk metadata and a processed-sources ledger. Queries embed the
//! question, search the index, and hand the nearest chunks to a
//! completion backend as context.
//!
//! The crate splits along those seams:
//! - [`retrieval::vector_index`]: the append-only flat index
//! - [`retrieval::corpus`]: index, metadata, and ledger behind one lock
//! - [`retrieval::ingestion_engine`]: the polling scheduler
//! - [`retrieval::query_engine`]: question answering
//! - [`extract`] and [`llm`]: the extraction and completion clients

pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod retrieval;
pub mod status;

pub use config::RetrieverConfig;
pub use error::{Result, RetrieverError};
pub use status::{IngestionStatus, StatusHandle, StatusReport};
