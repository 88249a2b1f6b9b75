//! One-shot console question against the chat pipeline.
//!
//! Usage: console_chat "你是谁？" [--config config.yml]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use companion_chat::{prompts, Config, Error, Pipeline};

#[derive(Parser)]
#[command(name = "console_chat")]
#[command(about = "Ask the companion one question from the console", long_about = None)]
struct Cli {
    /// The question to ask
    question: String,

    /// Path to config.yml (default: ./config.yml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("companion_chat=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_file(&path)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => Config::new(),
    };

    let pipeline = Pipeline::bootstrap(config)
        .await
        .context("pipeline bootstrap failed")?;

    let reply = reply_or_apology(pipeline.chat(&cli.question).await)?;
    println!("{}", reply);

    Ok(())
}

/// Same boundary rule as the HTTP surface: a failed generation answers
/// with the fixed apology, never with provider detail.
fn reply_or_apology(result: companion_chat::Result<String>) -> anyhow::Result<String> {
    match result {
        Ok(reply) => Ok(reply),
        Err(Error::Generation(err)) => {
            tracing::error!("chat failed: {}", err);
            Ok(prompts::FALLBACK_REPLY.to_string())
        }
        Err(err) => Err(err.into()),
    }
}
