use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rag_core::loader::load_dir;
use rag_core::{BonusTarget, Engine, EngineConfig, EngineStats, SearchOutcome};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Chunk and index a document directory, then inspect or query it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CorpusArgs {
    /// Directory holding .txt/.md documents
    #[arg(long, default_value = "./data")]
    input: PathBuf,
    /// JSON engine configuration; missing fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the target chunk size (characters)
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Override the chunk overlap (tokens)
    #[arg(long)]
    chunk_overlap: Option<usize>,
    /// Apply phrase bonuses to chunk text instead of chunk identifiers
    #[arg(long, default_value_t = false)]
    content_bonus: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index and print corpus statistics
    Stats {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
    /// Build the index and answer one query
    Query {
        #[command(flatten)]
        corpus: CorpusArgs,
        /// Query text
        #[arg(long)]
        q: String,
        /// Number of chunks to return
        #[arg(long, default_value_t = 3)]
        k: usize,
        /// Restrict results to one document id
        #[arg(long)]
        filter: Option<String>,
    },
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    query: &'a str,
    #[serde(flatten)]
    outcome: &'a SearchOutcome,
    stats: EngineStats,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Stats { corpus } => {
            let engine = open_engine(&corpus)?;
            println!("{}", serde_json::to_string_pretty(&engine.stats())?);
            Ok(())
        }
        Commands::Query { corpus, q, k, filter } => {
            let engine = open_engine(&corpus)?;
            let outcome = engine.search(&q, k, filter.as_deref())?;
            let out = QueryOutput { query: &q, outcome: &outcome, stats: engine.stats() };
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
    }
}

fn engine_config(args: &CorpusArgs) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(size) = args.chunk_size {
        config.chunk_size = size;
    }
    if let Some(overlap) = args.chunk_overlap {
        config.chunk_overlap = overlap;
    }
    if args.content_bonus {
        config.bonus_target = BonusTarget::Content;
    }
    Ok(config)
}

fn open_engine(args: &CorpusArgs) -> Result<Engine> {
    let engine = Engine::new(engine_config(args)?)?;
    let generation = engine.load_corpus(load_dir(&args.input));
    tracing::info!(input = %args.input.display(), generation, "index build complete");
    Ok(engine)
}
