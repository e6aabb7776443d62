//! Scan command - run a live scan and follow its results

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use canscan_client::transport::HttpTransportFactory;
use canscan_client::{ScanClient, ScanController, ScanState, ScanSummary};
use canscan_core::ScanRequest;
use serde::Serialize;
use tracing::debug;

use crate::console::{ConsoleActivityLog, ConsoleNotifier};
use crate::output::{colored_status, CountRow, OutputContext, OutputFormat, ResultRow};

/// How long to wait for the report after a completed scan
const REPORT_WAIT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct ScanOutput<'a> {
    summary: &'a ScanSummary,
    activity: Vec<canscan_core::LogEntry>,
    report: Option<String>,
}

/// Run one live scan until it completes, fails or is interrupted
pub async fn scan(client: &ScanClient, request: ScanRequest, ctx: &OutputContext) -> Result<()> {
    let activity = Arc::new(ConsoleActivityLog::new(ctx.is_interactive()));
    let controller = ScanController::new(
        Arc::new(HttpTransportFactory::new(client.clone())),
        Arc::new(ConsoleNotifier::new(ctx.quiet)),
        activity.clone(),
        Arc::new(client.clone()),
    );
    let mut report_rx = controller.subscribe_report();

    if ctx.is_interactive() {
        ctx.info(&format!(
            "Live scan on {} over {}{}",
            request.interface_name,
            request.transport,
            if request.simulate { " (simulated)" } else { "" }
        ));
        ctx.info("Press Ctrl+C to stop\n");
    }

    let handle = controller
        .start(request)
        .context("Failed to start live scan")?;
    let wait = handle.wait();
    tokio::pin!(wait);

    let summary = tokio::select! {
        summary = &mut wait => summary?,
        _ = tokio::signal::ctrl_c() => {
            debug!("Interrupted, cancelling scan");
            controller.cancel();
            wait.await?
        }
    };

    let report = if summary.state == ScanState::Completed {
        match tokio::time::timeout(REPORT_WAIT, report_rx.wait_for(|r| r.is_some())).await {
            Ok(Ok(report)) => report.clone(),
            _ => {
                ctx.warn("Report not available");
                None
            }
        }
    } else {
        None
    };

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&ScanOutput {
            summary: &summary,
            activity: activity.entries(),
            report,
        }),
        OutputFormat::Csv => print_results(&summary, ctx),
        OutputFormat::Table => {
            println!();
            print_results(&summary, ctx);
            print_counts(&summary, ctx);
            if let Some(report) = report {
                println!("\n{}", report);
            }
        }
    }

    match summary.state {
        ScanState::Failed => bail!("Live scan failed"),
        ScanState::Cancelled => {
            ctx.info("Live scan cancelled");
            Ok(())
        }
        _ => Ok(()),
    }
}

fn print_results(summary: &ScanSummary, ctx: &OutputContext) {
    let rows: Vec<ResultRow> = summary
        .results
        .iter()
        .enumerate()
        .map(|(i, result)| ResultRow::new(i + 1, result))
        .collect();
    ctx.print(&rows);
}

fn print_counts(summary: &ScanSummary, ctx: &OutputContext) {
    if summary.results.is_empty() {
        return;
    }

    let mut counts: Vec<CountRow> = summary
        .counts_by_type
        .iter()
        .map(|(kind, count)| CountRow {
            kind: kind.clone(),
            count: *count,
        })
        .collect();
    counts.sort_by(|a, b| a.kind.cmp(&b.kind));
    ctx.print(&counts);

    let mut statuses: Vec<_> = summary.counts_by_status.iter().collect();
    statuses.sort_by_key(|(status, _)| status.as_str());
    let line: Vec<String> = statuses
        .into_iter()
        .map(|(status, count)| format!("{} {}", count, colored_status(*status)))
        .collect();
    ctx.info(&line.join(", "));

    if summary.dropped_frames > 0 {
        ctx.warn(&format!(
            "{} frame(s) could not be decoded",
            summary.dropped_frames
        ));
    }
}
