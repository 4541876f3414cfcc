//! Worry spiral command-line front end.
//!
//! ```bash
//! # Interactive chat against the configured generation backend
//! spiral-agents chat
//!
//! # Canned responses only, reproducible
//! spiral-agents --offline --seed 42 chat
//!
//! # JSON-lines transport on stdin/stdout, sessions on disk
//! spiral-agents --store-dir ./sessions serve-stdio
//!
//! # Inspect how a worry is classified
//! spiral-agents classify "my boss wants to talk tomorrow"
//! ```

mod config;
mod repl;
mod stdio;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{Overrides, SpiralConfig};
use coordination::{ChatGateway, ConcernClassifier};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "spiral-agents", author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ./spiral.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Persist sessions as JSON files in this directory
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Fixed RNG seed for reproducible responses
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Do not call the generation backend; use canned text
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    /// Debug-level logging unless RUST_LOG is set
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive chat session
    Chat,
    /// JSON-lines chat transport on stdin/stdout
    ServeStdio,
    /// Print the classification of a worry as JSON
    Classify {
        /// The worry to classify
        #[arg(required = true)]
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = SpiralConfig::load(cli.config.as_deref())?.apply(Overrides {
        store_dir: cli.store_dir,
        seed: cli.seed,
        offline: cli.offline,
    });

    match cli.command {
        Commands::Classify { text } => {
            let classifier = ConcernClassifier::new(config.load_lexicon()?.shared());
            let report = classifier.analyze(&text.join(" "), None);
            info!(summary = %report.summary(), "Classified");
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to encode classification")?
            );
        }
        Commands::Chat => {
            let orchestrator = config.build_orchestrator().await?;
            let mut repl = repl::Repl::new(&orchestrator, tokio::io::stdout());
            repl.run(BufReader::new(tokio::io::stdin())).await?;
            let removed = orchestrator.purge_expired().await?;
            info!(removed, "Chat finished");
        }
        Commands::ServeStdio => {
            let orchestrator = config.build_orchestrator().await?.shared();
            let gateway = ChatGateway::new(orchestrator);
            info!("Serving JSON-lines chat on stdin/stdout");
            stdio::serve(
                &gateway,
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            )
            .await?;
            let health = gateway.orchestrator().generation_health();
            info!(
                level = %health.level,
                failures = health.total_failures,
                calls = health.total_calls,
                "Generation backend summary"
            );
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout belongs to the chat output.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
