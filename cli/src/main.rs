//! `docsearch`: index a directory of text files and rank them against a query.

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use docsearch_retrieval::{
    DocumentStore, EmbeddingProviderType, InMemoryDocumentStore, PlainTextExtractor,
    RetrievalConfig, SearchResult, SemanticSearch, TextExtractor,
};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Parser)]
#[command(name = "docsearch")]
#[command(about = "Semantic search over a directory of documents", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Maximum number of results (defaults to `search.default_limit`).
    #[arg(long)]
    limit: Option<usize>,

    /// Never call the remote provider; embed with the local fallback only.
    #[arg(long)]
    offline: bool,

    /// Directory to index.
    dir: PathBuf,

    /// Free-text query.
    query: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli).await?;
    let limit = cli.limit.unwrap_or(config.search.default_limit);

    let engine = SemanticSearch::from_config(config).context("failed to build search engine")?;
    info!("Using embedding provider {}", engine.provider().name());

    let store = InMemoryDocumentStore::new();
    let indexed = index_directory(&engine, &cli.dir, &store).await?;
    info!("Indexed {indexed} files from {}", cli.dir.display());

    let results = engine
        .search_store(&cli.query, &store, limit)
        .await
        .context("search failed")?;

    for line in format_results(&results) {
        println!("{line}");
    }
    Ok(())
}

async fn load_config(cli: &Cli) -> Result<RetrievalConfig> {
    let mut config = match &cli.config {
        Some(path) => RetrievalConfig::load(path)
            .await
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RetrievalConfig::default(),
    };
    if cli.offline {
        config.embedding.provider = EmbeddingProviderType::Fallback;
    }
    Ok(config)
}

/// Supported files under `dir`, in a stable order.
fn collect_files(dir: &Path, extractor: &dyn TextExtractor) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| extractor.supports(path))
        .collect()
}

/// Extract and embed every supported file under `dir` into `store`.
///
/// Files that fail to extract are logged and skipped.
async fn index_directory(
    engine: &SemanticSearch,
    dir: &Path,
    store: &dyn DocumentStore,
) -> Result<usize> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }

    let extractor = PlainTextExtractor;
    let ingestor = engine.ingestor();
    let mut indexed = 0;
    for path in collect_files(dir, &extractor) {
        match ingestor.ingest_file(&path, &extractor, store).await {
            Ok(document) => {
                debug!("Indexed {}", document.id);
                indexed += 1;
            }
            Err(e) => warn!("Skipping {}: {e}", path.display()),
        }
    }
    Ok(indexed)
}

fn format_results(results: &[SearchResult]) -> Vec<String> {
    results
        .iter()
        .map(|result| {
            format!(
                "{:.3}  {}  {}",
                result.similarity, result.document.id, result.document.title
            )
        })
        .collect()
}
