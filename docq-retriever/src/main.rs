use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use docq_embed::{EmbedConfig, HttpEmbeddingClient};
use docq_retriever::config::RetrieverConfig;
use docq_retriever::extract::TextExtractor;
use docq_retriever::llm::{CompletionClient, CompletionConfig};
use docq_retriever::retrieval::{IngestionEngine, QueryEngine, SharedCorpus};
use docq_retriever::status::{StatusHandle, StatusReport};

#[derive(Parser)]
#[command(name = "docq", about = "Document ingestion and retrieval pipeline", version)]
struct Cli {
    /// Directory scanned for source documents
    #[arg(long, default_value = "documents")]
    sources: PathBuf,

    /// Directory holding the index, metadata, and ledger
    #[arg(long, default_value = "data")]
    data: PathBuf,

    /// Base URL of the embedding backend
    #[arg(long, default_value = "http://localhost:11434")]
    embed_url: String,

    /// Embedding model name
    #[arg(long, default_value = "nomic-embed-text")]
    embed_model: String,

    /// Base URL of the completion backend
    #[arg(long, default_value = "http://localhost:11434")]
    llm_url: String,

    /// Completion model name
    #[arg(long, default_value = "llama3.2")]
    llm_model: String,

    /// Base URL of the text extraction server
    #[arg(long, default_value = "http://localhost:9998")]
    extract_url: String,

    /// Seconds to wait between ingestion passes
    #[arg(long, default_value_t = 30)]
    poll_seconds: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the ingestion scheduler until interrupted
    Ingest {
        /// Run this many passes and exit instead of polling forever
        #[arg(long)]
        passes: Option<u32>,
    },
    /// Ask a question against the indexed corpus
    ///
    /// The `ingestion` field of the response reflects this process only;
    /// an `ingest` command running in a separate process reports progress
    /// through its own logs, not here.
    Query {
        /// The question text
        text: String,
    },
    /// Print corpus size and ingestion status as JSON
    ///
    /// Like `query`, the ingestion progress shown is per-process.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = RetrieverConfig::new(&cli.sources, &cli.data)
        .with_poll_interval(Duration::from_secs(cli.poll_seconds));
    let corpus = SharedCorpus::open(&config).await?;
    let status = StatusHandle::new();
    let embedder = Arc::new(HttpEmbeddingClient::new(
        EmbedConfig::new(&cli.embed_url)
            .with_model(&cli.embed_model)
            .with_dimension(config.dimension),
    )?);

    match cli.command {
        Command::Ingest { passes } => {
            let extractor = TextExtractor::new(&cli.extract_url, Duration::from_secs(120))?;
            let engine = IngestionEngine::new(
                config,
                corpus,
                status,
                embedder,
                extractor,
            );
            match passes {
                Some(n) => {
                    for _ in 0..n {
                        let stats = engine.run_once().await?;
                        info!(
                            processed = stats.sources_processed,
                            skipped = stats.sources_skipped,
                            chunks = stats.chunks_added,
                            "pass complete"
                        );
                    }
                }
                None => {
                    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
                    let worker = tokio::spawn(async move { engine.run(stop_rx).await });
                    tokio::signal::ctrl_c()
                        .await
                        .context("waiting for shutdown signal")?;
                    info!("shutdown requested");
                    let _ = stop_tx.send(true);
                    worker.await.context("joining ingestion worker")?;
                }
            }
        }
        Command::Query { text } => {
            let completion = CompletionClient::new(
                CompletionConfig::new(&cli.llm_url).with_model(&cli.llm_model),
            )?;
            let engine = QueryEngine::new(
                corpus,
                status,
                embedder,
                completion,
                config.top_k,
                config.max_context_chunks,
            );
            let response = engine.answer(&text).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Status => {
            let ingestion = status.snapshot().await;
            let report = StatusReport {
                documents_indexed: corpus.chunk_count().await,
                progress_percent: ingestion.progress_percent(),
                ingestion,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
