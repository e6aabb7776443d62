//! canscan - Command-line tool for live CAN bus security scans
//!
//! Drives live scans against a scan backend and prints results, activity and
//! the final report. Stored results and the report can also be read directly.

mod commands;
mod config;
mod console;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use canscan_client::ScanClient;
use canscan_core::{ScanRequest, TransportKind};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{ArgOverrides, Config};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "canscan")]
#[command(author, version, about = "Live CAN bus security scans")]
#[command(propagate_version = true)]
struct Cli {
    /// Scan backend URL
    #[arg(short, long, env = "CANSCAN_SERVER")]
    server: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "CANSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a live scan and follow its results
    Scan {
        /// Bus interface to scan
        #[arg(short, long)]
        interface: Option<String>,

        /// Produce synthetic results instead of touching the bus
        #[arg(long)]
        simulate: bool,

        /// Live transport: stream (SSE) or socket (WebSocket)
        #[arg(short, long)]
        transport: Option<TransportKind>,
    },

    /// Print the current scan report
    Report,

    /// List stored results from earlier scans
    History {
        /// Show at most this many results
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Delete all stored results
    #[command(name = "clear-history")]
    ClearHistory,

    /// Check that the backend is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let mut overrides = ArgOverrides {
        server: cli.server.as_deref(),
        no_color: cli.no_color,
        ..Default::default()
    };
    if let Commands::Scan {
        interface,
        simulate,
        transport,
    } = &cli.command
    {
        overrides.interface = interface.as_deref();
        overrides.simulate = *simulate;
        overrides.transport = *transport;
    }
    let merged = config.merge_with_args(overrides)?;

    // Create output context
    let ctx = OutputContext::new(cli.output, merged.no_color, cli.quiet);
    let client = create_client(&merged.server)?;

    // Execute command
    match &cli.command {
        Commands::Scan { .. } => {
            let request = ScanRequest::new(merged.interface.clone(), merged.transport)
                .with_simulate(merged.simulate);
            commands::scan(&client, request, &ctx).await?;
        }

        Commands::Report => {
            commands::report(&client, &ctx).await?;
        }

        Commands::History { limit } => {
            commands::history(&client, *limit, &ctx).await?;
        }

        Commands::ClearHistory => {
            commands::clear_history(&client, &ctx).await?;
        }

        Commands::Health => {
            commands::health(&client, &ctx).await?;
        }
    }

    Ok(())
}

/// Create a scan client for the given server URL
fn create_client(server: &str) -> Result<ScanClient> {
    ScanClient::new(server).context("Failed to create scan client")
}
