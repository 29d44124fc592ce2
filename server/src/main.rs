use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use rag_core::EngineConfig;
use server::{build_app, ServerOptions};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Directory holding the documents to index
    #[arg(long, default_value = "./data")]
    data: PathBuf,
    /// JSON engine configuration; missing fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Maximum number of cached query results
    #[arg(long)]
    cache_max_entries: Option<usize>,
    /// Seconds a cached result stays fresh
    #[arg(long)]
    cache_ttl_secs: Option<u64>,
    /// Token required by document and index mutation endpoints
    #[arg(long, env = "ADMIN_TOKEN")]
    admin_token: Option<String>,
    /// Host to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let mut engine = match &args.config {
        Some(path) => EngineConfig::from_json_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(n) = args.cache_max_entries {
        engine.cache_max_entries = n;
    }
    if let Some(secs) = args.cache_ttl_secs {
        engine.cache_ttl_secs = secs;
    }

    let app: Router = build_app(ServerOptions { data_dir: args.data, engine, admin_token: args.admin_token })?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
