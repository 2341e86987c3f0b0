//! End-to-end tests over a temporary corpus with mocked embedding,
//! completion, and extraction backends.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;

use docq_embed::{EmbedConfig, HttpEmbeddingClient};
use docq_retriever::config::RetrieverConfig;
use docq_retriever::error::RetrieverError;
use docq_retriever::extract::TextExtractor;
use docq_retriever::llm::{CompletionClient, CompletionConfig};
use docq_retriever::retrieval::{IngestionEngine, QueryEngine, SharedCorpus};
use docq_retriever::status::StatusHandle;

const DIMENSION: usize = 3;

fn test_config(root: &Path) -> RetrieverConfig {
    RetrieverConfig::new(root.join("sources"), root.join("data")).with_dimension(DIMENSION)
}

fn embedder_for(server: &MockServer) -> Arc<HttpEmbeddingClient> {
    Arc::new(
        HttpEmbeddingClient::new(
            EmbedConfig::new(server.base_url()).with_dimension(DIMENSION),
        )
        .unwrap(),
    )
}

fn ingestion_engine(
    config: RetrieverConfig,
    corpus: SharedCorpus,
    embed_server: &MockServer,
    extract_server: &MockServer,
) -> IngestionEngine {
    IngestionEngine::new(
        config,
        corpus,
        StatusHandle::new(),
        embedder_for(embed_server),
        TextExtractor::new(extract_server.base_url(), Duration::from_secs(5)).unwrap(),
    )
}

fn query_engine(
    config: &RetrieverConfig,
    corpus: SharedCorpus,
    embed_server: &MockServer,
    llm_server: &MockServer,
) -> QueryEngine {
    QueryEngine::new(
        corpus,
        StatusHandle::new(),
        embedder_for(embed_server),
        CompletionClient::new(CompletionConfig::new(llm_server.base_url())).unwrap(),
        config.top_k,
        config.max_context_chunks,
    )
}

/// Mounts an embedding mock that answers any request with one vector.
async fn mount_embed_mock(server: &MockServer, vector: [f32; DIMENSION]) -> httpmock::Mock<'_> {
    server
        .mock_async(move |when, then| {
            when.method(POST).path("/api/embed");
            then.status(200)
                .json_body(serde_json::json!({ "embeddings": [vector] }));
        })
        .await
}

/// A paragraph long enough to survive the informative-chunk filter
/// but short enough to stay a single chunk.
fn paragraph(topic: &str) -> String {
    format!(
        "{topic} is discussed here at length. This paragraph carries enough \
         prose to clear the minimum chunk length used during ingestion, while \
         staying well under one chunk window in total size."
    )
}

#[tokio::test]
async fn ingestion_indexes_each_source_exactly_once() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    tokio::fs::create_dir_all(&config.sources_dir).await.unwrap();
    tokio::fs::write(config.sources_dir.join("apples.txt"), paragraph("Apples"))
        .await
        .unwrap();
    tokio::fs::write(config.sources_dir.join("pears.md"), paragraph("Pears"))
        .await
        .unwrap();
    // Hidden files never reach the pipeline.
    tokio::fs::write(config.sources_dir.join(".draft.txt"), paragraph("Hidden"))
        .await
        .unwrap();

    let embed_server = MockServer::start_async().await;
    mount_embed_mock(&embed_server, [0.1, 0.2, 0.3]).await;
    let extract_server = MockServer::start_async().await;

    let corpus = SharedCorpus::open(&config).await.unwrap();
    let engine = ingestion_engine(config.clone(), corpus.clone(), &embed_server, &extract_server);

    let stats = engine.run_once().await.unwrap();
    assert_eq!(stats.sources_found, 2);
    assert_eq!(stats.sources_processed, 2);
    assert_eq!(stats.chunks_added, 2);
    assert_eq!(corpus.chunk_count().await, 2);

    let ledger = tokio::fs::read_to_string(config.ledger_path()).await.unwrap();
    assert!(ledger.contains("apples.txt"));
    assert!(ledger.contains("pears.md"));
    assert!(!ledger.contains(".draft.txt"));

    // Nothing new, nothing reprocessed.
    let stats = engine.run_once().await.unwrap();
    assert_eq!(stats.sources_found, 0);
    assert_eq!(corpus.chunk_count().await, 2);
}

#[tokio::test]
async fn failed_extraction_is_retried_on_the_next_pass() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    tokio::fs::create_dir_all(&config.sources_dir).await.unwrap();
    tokio::fs::write(config.sources_dir.join("report.pdf"), b"%PDF-1.4 junk")
        .await
        .unwrap();

    let embed_server = MockServer::start_async().await;
    mount_embed_mock(&embed_server, [1.0, 0.0, 0.0]).await;
    let extract_server = MockServer::start_async().await;
    let broken = extract_server
        .mock_async(|when, then| {
            when.method(PUT).path("/tika");
            then.status(500).body("parser crashed");
        })
        .await;

    let corpus = SharedCorpus::open(&config).await.unwrap();
    let engine = ingestion_engine(config.clone(), corpus.clone(), &embed_server, &extract_server);

    let stats = engine.run_once().await.unwrap();
    assert_eq!(stats.sources_skipped, 1);
    assert_eq!(stats.sources_processed, 0);
    assert_eq!(corpus.chunk_count().await, 0);
    assert!(!config.ledger_path().exists() || {
        let ledger = std::fs::read_to_string(config.ledger_path()).unwrap();
        !ledger.contains("report.pdf")
    });

    // Extraction recovers; the same source is picked up again.
    broken.delete_async().await;
    extract_server
        .mock_async(|when, then| {
            when.method(PUT).path("/tika");
            then.status(200).body(paragraph("Quarterly results"));
        })
        .await;

    let stats = engine.run_once().await.unwrap();
    assert_eq!(stats.sources_processed, 1);
    assert_eq!(corpus.chunk_count().await, 1);
}

#[tokio::test]
async fn persist_failure_keeps_the_pass_alive_with_memory_ahead_of_disk() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    tokio::fs::create_dir_all(&config.sources_dir).await.unwrap();
    tokio::fs::write(config.sources_dir.join("apples.txt"), paragraph("Apples"))
        .await
        .unwrap();

    let embed_server = MockServer::start_async().await;
    mount_embed_mock(&embed_server, [0.2, 0.4, 0.6]).await;
    let extract_server = MockServer::start_async().await;

    let corpus = SharedCorpus::open(&config).await.unwrap();
    // A directory squatting on the index path makes every artifact
    // write fail regardless of process privileges.
    tokio::fs::create_dir_all(config.index_path()).await.unwrap();

    let engine = ingestion_engine(config.clone(), corpus.clone(), &embed_server, &extract_server);
    let stats = engine.run_once().await.unwrap();
    assert_eq!(stats.sources_processed, 1);

    // Memory advanced; disk did not.
    assert_eq!(corpus.chunk_count().await, 1);
    assert!(!config.ledger_path().exists());

    // The in-memory ledger still prevents a rescan of the source.
    let stats = engine.run_once().await.unwrap();
    assert_eq!(stats.sources_found, 0);
    assert_eq!(corpus.chunk_count().await, 1);
}

#[tokio::test]
async fn query_returns_answer_with_matches() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    tokio::fs::create_dir_all(&config.sources_dir).await.unwrap();
    tokio::fs::write(config.sources_dir.join("apples.txt"), paragraph("Apples"))
        .await
        .unwrap();

    let embed_server = MockServer::start_async().await;
    mount_embed_mock(&embed_server, [0.5, 0.5, 0.0]).await;
    let extract_server = MockServer::start_async().await;
    let llm_server = MockServer::start_async().await;
    let generate = llm_server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .body_contains("Context:")
                .body_contains("Question: What about apples?");
            then.status(200)
                .json_body(serde_json::json!({"response": "Apples are discussed."}));
        })
        .await;

    let corpus = SharedCorpus::open(&config).await.unwrap();
    ingestion_engine(config.clone(), corpus.clone(), &embed_server, &extract_server)
        .run_once()
        .await
        .unwrap();
    assert_eq!(corpus.chunk_count().await, 1);

    let engine = query_engine(&config, corpus, &embed_server, &llm_server);
    let response = engine.answer("What about apples?").await.unwrap();
    assert_eq!(response.answer, "Apples are discussed.");
    assert_eq!(response.matches.len(), 1);
    assert_eq!(response.matches[0].filename, "apples.txt");
    generate.assert_async().await;
}

#[tokio::test]
async fn empty_corpus_query_goes_straight_to_completion() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    tokio::fs::create_dir_all(&config.sources_dir).await.unwrap();

    let embed_server = MockServer::start_async().await;
    let embed_mock = mount_embed_mock(&embed_server, [0.0, 0.0, 1.0]).await;
    let llm_server = MockServer::start_async().await;
    llm_server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .body_contains("Question: Anything indexed?");
            then.status(200)
                .json_body(serde_json::json!({"response": "Nothing yet."}));
        })
        .await;

    let corpus = SharedCorpus::open(&config).await.unwrap();
    let engine = query_engine(&config, corpus, &embed_server, &llm_server);
    let response = engine.answer("Anything indexed?").await.unwrap();
    assert_eq!(response.answer, "Nothing yet.");
    assert!(response.matches.is_empty());
    assert_eq!(embed_mock.hits_async().await, 0);
}

#[tokio::test]
async fn query_time_embedding_outage_leaves_corpus_intact() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    tokio::fs::create_dir_all(&config.sources_dir).await.unwrap();
    tokio::fs::write(config.sources_dir.join("apples.txt"), paragraph("Apples"))
        .await
        .unwrap();

    let embed_server = MockServer::start_async().await;
    mount_embed_mock(&embed_server, [0.9, 0.1, 0.0]).await;
    let extract_server = MockServer::start_async().await;

    let corpus = SharedCorpus::open(&config).await.unwrap();
    ingestion_engine(config.clone(), corpus.clone(), &embed_server, &extract_server)
        .run_once()
        .await
        .unwrap();

    let dead_embed = MockServer::start_async().await;
    dead_embed
        .mock_async(|when, then| {
            when.method(POST).path("/api/embed");
            then.status(500).body("out of memory");
        })
        .await;
    let llm_server = MockServer::start_async().await;

    let engine = query_engine(&config, corpus.clone(), &dead_embed, &llm_server);
    let err = engine.answer("What about apples?").await.unwrap_err();
    assert!(matches!(
        err,
        RetrieverError::Backend {
            service: "embedding",
            ..
        }
    ));
    assert_eq!(corpus.chunk_count().await, 1);
}
