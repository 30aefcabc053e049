use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hindsight::cli::{Cli, Commands};
use hindsight::config::HindsightConfig;
use hindsight::embedding::{CachedEmbedder, Embedder, OpenRouterEmbedder};
use hindsight::error::Result;
use hindsight::store::{ExperienceRecord, ExperienceStore};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("hindsight=debug")
    } else {
        EnvFilter::new("hindsight=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let data_dir = cli.data_dir.unwrap_or_else(|| PathBuf::from("."));
    let config = HindsightConfig::load(&data_dir).await?;

    match cli.command {
        Commands::Init => cmd_init(&data_dir, &config).await,
        Commands::Search {
            query,
            limit,
            keyword_only,
        } => {
            let store = build_store(&data_dir, &config, !keyword_only);
            let limit = limit.unwrap_or(config.search.default_limit);
            let results = store.search(&query, limit, !keyword_only).await?;

            if results.is_empty() {
                println!("No experiences found for: {query}");
            } else {
                println!("Found {} relevant experience(s) for '{query}':", results.len());
                print_records(&results);
            }
            Ok(())
        }
        Commands::Recent { limit } => {
            let store = build_store(&data_dir, &config, false);
            let limit = limit.unwrap_or(config.search.recent_limit);
            let results = store.get_recent(limit).await?;

            if results.is_empty() {
                println!("No experiences stored yet.");
            } else {
                print_records(&results);
            }
            Ok(())
        }
    }
}

async fn cmd_init(data_dir: &Path, config: &HindsightConfig) -> Result<()> {
    tokio::fs::create_dir_all(data_dir.join(&config.storage.dir)).await?;
    if !data_dir.join("config.toml").exists() {
        config.save(data_dir).await?;
    }
    println!(
        "Initialized experience store at {}",
        data_dir.join(&config.storage.dir).display()
    );
    Ok(())
}

fn build_store(data_dir: &Path, config: &HindsightConfig, want_embeddings: bool) -> ExperienceStore {
    let embedder = if want_embeddings {
        match OpenRouterEmbedder::new(&config.api, &config.embedding, config.api_key()) {
            Ok(embedder) => Some(CachedEmbedder::new(
                Arc::new(embedder) as Arc<dyn Embedder>,
                config.embedding.cache_capacity,
            )),
            Err(e) => {
                warn!(error = %e, "Semantic search unavailable; using keyword scoring");
                None
            }
        }
    } else {
        None
    };

    ExperienceStore::new(data_dir.join(&config.storage.dir), embedder)
}

fn print_records(records: &[ExperienceRecord]) {
    for (i, record) in records.iter().enumerate() {
        println!();
        println!("{}. {}", i + 1, record.task);
        println!("   Pattern:  {}", record.pattern);
        println!("   Keywords: {}", record.keywords.join(", "));
        println!("   Insight:  {}", record.insight);
        println!("   Result:   {}", record.result);
        println!(
            "   Attempts: {}  ({})",
            record.attempts_count,
            record.created_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
}
