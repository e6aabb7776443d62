//! Report command - print the backend's scan report

use anyhow::{Context, Result};
use canscan_client::ScanClient;
use canscan_core::ReportDocument;

use crate::output::{OutputContext, OutputFormat};

/// Fetch and print the current report
pub async fn report(client: &ScanClient, ctx: &OutputContext) -> Result<()> {
    let report = client
        .get_report()
        .await
        .context("Failed to fetch report")?;

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&ReportDocument { report }),
        _ => println!("{}", report),
    }
    Ok(())
}
