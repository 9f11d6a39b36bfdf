//! lorebot CLI — the main entry point.
//!
//! Commands:
//! - `run`      — Serve the Telegram bot (long polling)
//! - `chat`     — Talk to the bot in the terminal
//! - `ask`      — One-shot question through the prompt assembler
//! - `ingest`   — Add a local document to the knowledge base
//! - `onboard`  — Write a starter config and template files
//! - `doctor`   — Diagnose configuration and connectivity

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "lorebot",
    about = "lorebot — Telegram front end for an LLM with a growing knowledge base",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.lorebot/config.toml)
    #[arg(short, long, global = true, env = "LOREBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Telegram bot and serve until Ctrl-C
    Run,

    /// Chat with the bot in the terminal (`/upload <path>` ingests a file)
    Chat,

    /// Ask a single question and print the answer
    Ask {
        /// The question text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Summarise a local .txt/.md document into the knowledge base
    Ingest {
        /// Path to the document
        path: PathBuf,
    },

    /// Write a default config and template files
    Onboard,

    /// Check configuration, templates and provider reachability
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Run => commands::run::run(config).await?,
        Commands::Chat => commands::chat::run(config).await?,
        Commands::Ask { text } => commands::ask::run(config, &text.join(" ")).await?,
        Commands::Ingest { path } => commands::ingest::run(config, &path).await?,
        Commands::Onboard => commands::onboard::run(config).await?,
        Commands::Doctor => commands::doctor::run(config).await?,
    }

    Ok(())
}
