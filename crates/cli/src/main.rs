//! Storyloom CLI: operator tooling for the context engine.
//!
//! Commands:
//! - `context`: Render the system prompt a project would inject
//! - `chunks` : List extracted chunks as JSON
//! - `outline`: Outline a plot offline (template fallback)
//! - `config` : Show the effective or default configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use storyloom_context::{ChunkType, Priority};

mod commands;

#[derive(Parser)]
#[command(
    name = "storyloom",
    about = "Storyloom: context assembly and resilient generation for writing projects",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the context block for a project snapshot (JSON file)
    Context {
        /// Path to an operation snapshot: project plus related entities
        snapshot: PathBuf,

        /// Override the token budget
        #[arg(short, long)]
        max_tokens: Option<usize>,

        /// Critical chunks only, under the minimal budget
        #[arg(long)]
        minimal: bool,

        /// Chapter the writer is working on
        #[arg(short, long)]
        current_chapter: Option<String>,
    },

    /// Print the extracted chunks as JSON
    Chunks {
        snapshot: PathBuf,

        #[arg(short, long)]
        max_tokens: Option<usize>,

        /// Only extract these types (repeatable)
        #[arg(long, value_parser = commands::parse_chunk_type)]
        only: Vec<ChunkType>,

        /// Drop chunks below this priority
        #[arg(long, value_parser = commands::parse_priority)]
        min_priority: Option<Priority>,

        #[arg(short, long)]
        current_chapter: Option<String>,
    },

    /// Outline the plot without a generation backend
    Outline {
        snapshot: PathBuf,

        /// Story length in words (defaults to the project's target)
        #[arg(short, long)]
        target_words: Option<u32>,
    },

    /// Show configuration
    Config {
        /// Print the built-in defaults instead of the effective config
        #[arg(long)]
        default: bool,

        /// Print the config file path
        #[arg(long, conflicts_with = "default")]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Context {
            snapshot,
            max_tokens,
            minimal,
            current_chapter,
        } => commands::context::run(&snapshot, max_tokens, minimal, current_chapter)?,
        Commands::Chunks {
            snapshot,
            max_tokens,
            only,
            min_priority,
            current_chapter,
        } => commands::chunks::run(&snapshot, max_tokens, only, min_priority, current_chapter)?,
        Commands::Outline {
            snapshot,
            target_words,
        } => commands::outline::run(&snapshot, target_words).await?,
        Commands::Config { default, path } => commands::config_cmd::run(default, path)?,
    }

    Ok(())
}
