//! canscan-mockd - Mock CAN scan backend
//!
//! Serves simulated live scans over SSE and WebSocket plus an in-memory
//! results store, so the client and CLI can run without a CAN bus.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use canscan_mockd::{create_router, MockConfig, MockState};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "canscan-mockd")]
#[command(about = "Mock CAN scan backend", long_about = None)]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(short, long, env = "CANSCAN_MOCK_BIND", default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// Pause between live scan frames, in milliseconds
    #[arg(long, default_value_t = 300)]
    frame_delay_ms: u64,

    /// Serve this file as the report instead of generating one
    #[arg(long)]
    report_file: Option<PathBuf>,

    /// Send the lines of this file verbatim on every live scan
    #[arg(long)]
    script_file: Option<PathBuf>,
}

fn load_config(args: &Args) -> anyhow::Result<MockConfig> {
    let mut config =
        MockConfig::default().with_frame_delay(Duration::from_millis(args.frame_delay_ms));

    if let Some(path) = &args.report_file {
        let report = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read report file {}", path.display()))?;
        config = config.with_report(report);
    }

    if let Some(path) = &args.script_file {
        let script = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script file {}", path.display()))?;
        config = config.with_script(script.lines().filter(|l| !l.trim().is_empty()));
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "canscan_mockd=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    tracing::info!(
        bind = %args.bind,
        frame_delay_ms = args.frame_delay_ms,
        scripted = config.script.is_some(),
        "Starting canscan-mockd"
    );

    let app = create_router(MockState::new(config));

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
