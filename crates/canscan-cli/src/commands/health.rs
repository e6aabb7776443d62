//! Health command - backend liveness check

use anyhow::{Context, Result};
use canscan_client::ScanClient;

use crate::output::{OutputContext, OutputFormat};

/// Check that the scan backend is reachable
pub async fn health(client: &ScanClient, ctx: &OutputContext) -> Result<()> {
    let status = client
        .health()
        .await
        .with_context(|| format!("Backend at {} is not reachable", client.base_url()))?;

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&serde_json::json!({ "status": status })),
        _ => ctx.success(&format!("{}: {}", client.base_url(), status)),
    }
    Ok(())
}
