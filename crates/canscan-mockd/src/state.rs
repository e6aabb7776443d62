//! Shared state for the mock backend

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use canscan_core::{ScanResult, ScanStatus, StoredResult};
use chrono::Utc;
use parking_lot::RwLock;

/// Pause between frames when nothing else is configured
pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(300);

/// Behaviour knobs for the mock backend
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Pause after each emitted frame
    pub frame_delay: Duration,
    /// Fixed report text; generated from the stored results when unset
    pub report: Option<String>,
    /// Answer report requests with 503
    pub report_offline: bool,
    /// Raw frames sent verbatim on every live scan instead of a scenario
    pub script: Option<Vec<String>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            frame_delay: DEFAULT_FRAME_DELAY,
            report: None,
            report_offline: false,
            script: None,
        }
    }
}

impl MockConfig {
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    pub fn with_report(mut self, report: impl Into<String>) -> Self {
        self.report = Some(report.into());
        self
    }

    pub fn with_report_offline(mut self) -> Self {
        self.report_offline = true;
        self
    }

    /// Send these frames verbatim on every live scan
    ///
    /// Leaving out a `done` frame makes the backend hang up mid-scan.
    pub fn with_script<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script = Some(frames.into_iter().map(Into::into).collect());
        self
    }
}

struct Inner {
    config: MockConfig,
    results: RwLock<Vec<StoredResult>>,
    next_id: AtomicI64,
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct MockState {
    inner: Arc<Inner>,
}

impl Default for MockState {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

impl MockState {
    pub fn new(config: MockConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                results: RwLock::new(Vec::new()),
                next_id: AtomicI64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &MockConfig {
        &self.inner.config
    }

    /// Store a result the way the scan logger does
    pub fn record(&self, result: &ScanResult) -> i64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let details = serde_json::to_string(result).ok();

        self.inner.results.write().push(StoredResult {
            id,
            timestamp: Some(Utc::now().to_rfc3339()),
            kind: result.kind.clone(),
            status: result.status,
            details,
        });
        id
    }

    /// Stored results, newest first
    pub fn results(&self) -> Vec<StoredResult> {
        let mut rows = self.inner.results.read().clone();
        rows.reverse();
        rows
    }

    /// Delete every stored result, returning how many were removed
    pub fn clear(&self) -> u64 {
        let mut rows = self.inner.results.write();
        let cleared = rows.len() as u64;
        rows.clear();
        cleared
    }

    /// Markdown report over the stored results
    pub fn report(&self) -> String {
        if let Some(report) = &self.inner.config.report {
            return report.clone();
        }

        let rows = self.inner.results.read();
        let failed = rows
            .iter()
            .filter(|r| r.status == ScanStatus::Failed)
            .count();

        let mut report = String::from("# CAN Security Scan Report\n\n");
        report.push_str(&format!("Generated: {}\n\n", Utc::now().to_rfc3339()));
        report.push_str(&format!(
            "Total results: {} ({} failed)\n\n",
            rows.len(),
            failed
        ));

        if rows.is_empty() {
            report.push_str("No results recorded.\n");
            return report;
        }

        report.push_str("| ID | Type | Status |\n|----|------|--------|\n");
        for row in rows.iter() {
            report.push_str(&format!("| {} | {} | {} |\n", row.id, row.kind, row.status));
        }
        report
    }
}
