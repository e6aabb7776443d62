//! History commands - stored results from earlier scans

use anyhow::{Context, Result};
use canscan_client::ScanClient;

use crate::output::{HistoryRow, OutputContext};

/// List stored results, newest first
pub async fn history(client: &ScanClient, limit: Option<usize>, ctx: &OutputContext) -> Result<()> {
    let results = client
        .list_results()
        .await
        .context("Failed to list stored results")?;

    let total = results.len();
    let rows: Vec<HistoryRow> = results
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(HistoryRow::from)
        .collect();

    ctx.print(&rows);
    if rows.len() < total {
        ctx.info(&format!("Showing {} of {} results", rows.len(), total));
    }
    Ok(())
}

/// Delete every stored result
pub async fn clear_history(client: &ScanClient, ctx: &OutputContext) -> Result<()> {
    let cleared = client
        .clear_results()
        .await
        .context("Failed to clear stored results")?;

    ctx.success(&format!("Cleared {} stored result(s)", cleared));
    Ok(())
}
