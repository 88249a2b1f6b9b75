//! Companion chat service - main entry point

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use companion_chat::{server, Config, Pipeline};

#[derive(Parser)]
#[command(name = "companion_chat")]
#[command(about = "Retrieval-augmented companion chat backend", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to serve on (e.g., 0.0.0.0:8080)
    #[arg(long, env = "SERVER_ADDR")]
    addr: Option<String>,

    /// Path to config.yml (default: ./config.yml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("companion_chat=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => Config::load_from_file(&path)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => Config::new(),
    };
    if let Some(addr) = cli.addr {
        config.addr = addr;
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .with_context(|| format!("invalid server address {}", config.addr))?;

    let pipeline = Pipeline::bootstrap(config)
        .await
        .context("pipeline bootstrap failed")?;

    server::serve(addr, Arc::new(pipeline)).await
}
