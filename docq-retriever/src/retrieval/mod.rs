//! Corpus storage, ingestion scheduling, and query answering.

pub mod corpus;
pub mod ingestion_engine;
pub mod query_engine;
pub mod vector_index;

pub use corpus::SharedCorpus;
pub use ingestion_engine::{IngestionEngine, PassStats};
pub use query_engine::{QueryEngine, QueryMatch, QueryResponse};
pub use vector_index::{FlatIndex, NO_MATCH};
