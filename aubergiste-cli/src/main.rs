// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Aubergiste CLI - operator tooling for the Aubergiste API layer.
//!
//! # Examples
//!
//! ```bash
//! # Probe the backend health endpoint once
//! aubergiste health https://api.aubergiste.fr/health
//!
//! # Keep probing every 30 seconds
//! aubergiste health https://api.aubergiste.fr/health --watch --interval 30
//!
//! # Diagnose CORS configuration
//! aubergiste cors https://api.aubergiste.fr/clients
//!
//! # Ad-hoc request
//! aubergiste request post https://api.aubergiste.fr/stays --body '{"room": 12}'
//!
//! # Inspect or clear the persisted offline queue
//! aubergiste queue list
//! aubergiste queue clear
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{cors, health, queue, request};

// ============================================================================
// CLI Definition
// ============================================================================

/// Aubergiste CLI - operator tooling for the API layer.
#[derive(Parser)]
#[command(name = "aubergiste")]
#[command(about = "Operator tooling for the Aubergiste API layer")]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Read the bearer token from the system keychain instead of the
    /// credentials file.
    #[arg(long, global = true)]
    pub keychain: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Probe one or more health endpoints.
    #[command(visible_alias = "h")]
    Health(health::HealthArgs),

    /// Diagnose CORS configuration for a URL.
    Cors(cors::CorsArgs),

    /// Send an ad-hoc request and print the response envelope.
    #[command(visible_alias = "r")]
    Request(request::RequestArgs),

    /// Inspect or clear the persisted offline queue.
    #[command(subcommand)]
    Queue(queue::QueueCommand),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("aubergiste=debug,info")
    } else {
        EnvFilter::new("aubergiste=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match &cli.command {
        Commands::Health(args) => health::run(&cli, args).await,
        Commands::Cors(args) => cors::run(&cli, args).await,
        Commands::Request(args) => request::run(&cli, args).await,
        Commands::Queue(command) => queue::run(&cli, command).await,
    }
}
