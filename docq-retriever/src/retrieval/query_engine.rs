//! Query answering: embed the question, search the corpus, and ask
//! the completion backend with the retrieved context.

use std::sync::Arc;

use docq_chunk::Chunk;
use docq_embed::EmbeddingProvider;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, RetrieverError};
use crate::llm::CompletionClient;
use crate::retrieval::corpus::SharedCorpus;
use crate::status::{IngestionStatus, StatusHandle};

/// Answer returned when the search produced no usable chunks.
const NO_CONTEXT_ANSWER: &str =
    "I could not find relevant information in the indexed documents.";

/// Longest chunk excerpt shown in a match.
const MATCH_EXCERPT_CHARS: usize = 200;

/// A retrieved source shown alongside the answer.
#[derive(Debug, Clone, Serialize)]
pub struct QueryMatch {
    pub filename: String,
    /// Chunk text cut to an excerpt for display.
    pub text: String,
}

/// Full response to one query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub matches: Vec<QueryMatch>,
    pub ingestion: IngestionStatus,
}

pub struct QueryEngine {
    corpus: SharedCorpus,
    status: StatusHandle,
    embedder: Arc<dyn EmbeddingProvider>,
    completion: CompletionClient,
    top_k: usize,
    max_context_chunks: usize,
}

impl QueryEngine {
    pub fn new(
        corpus: SharedCorpus,
        status: StatusHandle,
        embedder: Arc<dyn EmbeddingProvider>,
        completion: CompletionClient,
        top_k: usize,
        max_context_chunks: usize,
    ) -> Self {
        Self {
            corpus,
            status,
            embedder,
            completion,
            top_k,
            max_context_chunks,
        }
    }

    /// Answers a question against the current corpus.
    ///
    /// With an empty corpus the question goes straight to the
    /// completion backend without any context. Otherwise the query
    /// is embedded, the nearest chunks are gathered, and the answer
    /// is generated from a prompt that cites them.
    pub async fn answer(&self, query: &str) -> Result<QueryResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RetrieverError::EmptyQuery);
        }

        let ingestion = self.status.snapshot().await;
        let chunk_count = self.corpus.chunk_count().await;
        if chunk_count == 0 {
            debug!("corpus empty, answering without context");
            let answer = self
                .completion
                .generate(&format!("Question: {query}\n\nAnswer:"))
                .await?;
            return Ok(QueryResponse {
                answer,
                matches: Vec::new(),
                ingestion,
            });
        }

        let vector = self.embedder.embed_text(query).await?;
        let expected = self.corpus.dimension().await;
        if vector.len() != expected {
            return Err(RetrieverError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let k = self.top_k.min(chunk_count);
        let hits = self.corpus.search(&vector, k).await?;
        let positions: Vec<i64> = hits.iter().map(|&(_, pos)| pos).collect();
        let mut chunks = self.corpus.chunks_at(&positions).await;
        chunks.truncate(self.max_context_chunks);
        info!(query_len = query.len(), retrieved = chunks.len(), "query search complete");

        if chunks.is_empty() {
            return Ok(QueryResponse {
                answer: NO_CONTEXT_ANSWER.to_string(),
                matches: Vec::new(),
                ingestion,
            });
        }

        let context: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let prompt = format!(
            "Context: {}\n\nQuestion: {query}\n\nAnswer:",
            context.join("\n\n")
        );
        let answer = self.completion.generate(&prompt).await?;

        Ok(QueryResponse {
            answer,
            matches: display_matches(&chunks),
            ingestion,
        })
    }
}

/// Builds the display matches: one entry per distinct filename in
/// retrieval order, with the chunk text cut to an excerpt.
fn display_matches(chunks: &[Chunk]) -> Vec<QueryMatch> {
    let mut seen = std::collections::HashSet::new();
    chunks
        .iter()
        .filter(|chunk| seen.insert(chunk.filename.clone()))
        .map(|chunk| QueryMatch {
            filename: chunk.filename.clone(),
            text: excerpt(&chunk.text),
        })
        .collect()
}

fn excerpt(text: &str) -> String {
    if text.len() <= MATCH_EXCERPT_CHARS {
        return text.to_string();
    }
    let mut end = MATCH_EXCERPT_CHARS;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}
