use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use feedmerge::config::AppConfig;
use feedmerge::feed::FetchOptions;
use feedmerge::pipeline::{run, RunOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "feedmerge",
    about = "Merge YouTube channels and RSS/Atom feeds into one RSS 2.0 feed"
)]
struct Args {
    /// Configuration file
    #[arg(long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    /// Where to write the generated feed
    #[arg(long, value_name = "FILE", default_value = "docs/feed.xml")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    tracing::info!(path = %args.config.display(), "Loading config");
    let config = match AppConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let client = reqwest::Client::builder()
        .user_agent(concat!("feedmerge/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    match run(&config, &client, &FetchOptions::default(), &args.output).await? {
        RunOutcome::Written { .. } => {
            tracing::info!("Done");
            Ok(())
        }
        RunOutcome::AllSourcesFailed { .. } => std::process::exit(1),
    }
}
