//! RagDesk CLI: the main entry point.
//!
//! Commands:
//! - `init`    write a default config file
//! - `serve`   start the HTTP server (`/chat`, `/api/upload`, `/health`)
//! - `ask`     run one chat turn from the terminal
//! - `ingest`  index local documents
//! - `doctor`  diagnose configuration and provider connectivity

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "ragdesk",
    about = "RagDesk: retrieval-augmented support chat over your documents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.ragdesk/config.toml)
    #[arg(short, long, global = true, env = "RAGDESK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Start the HTTP server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask one question against the index
    Ask {
        /// The user message
        message: String,

        /// Ingest these documents first
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// JSON file with the conversation so far
        #[arg(long)]
        history: Option<PathBuf>,

        /// Print the standalone question and retrieved passages
        #[arg(short, long)]
        sources: bool,
    },

    /// Ingest documents into the index
    Ingest {
        /// PDF, DOCX or text files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Diagnose configuration and connectivity
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
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Init => commands::init::run(config).await?,
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Ask {
            message,
            files,
            history,
            sources,
        } => {
            commands::ask::run(
                config,
                commands::ask::AskArgs {
                    message,
                    files,
                    history,
                    show_sources: sources,
                },
            )
            .await?
        }
        Commands::Ingest { files } => commands::ingest::run(config, files).await?,
        Commands::Doctor => commands::doctor::run(config).await?,
    }

    Ok(())
}
