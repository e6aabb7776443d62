//! Output formatting for canscan (table, json, csv)

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use canscan_core::{LogEntry, LogLevel, ScanResult, ScanStatus, StoredResult};

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Whether human-readable progress lines should be printed
    pub fn is_interactive(&self) -> bool {
        self.format == OutputFormat::Table && !self.quiet
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print data in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("No data");
                    }
                } else {
                    let table = Table::new(data).to_string();
                    println!("{}", table);
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
            OutputFormat::Csv => {
                print_csv(data);
            }
        }
    }

    /// Print any serializable value as pretty JSON
    pub fn print_json<T: Serialize>(&self, value: &T) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
        );
    }
}

/// Print data as CSV
fn print_csv<T: Serialize>(data: &[T]) {
    if data.is_empty() {
        return;
    }

    let first = serde_json::to_value(&data[0]).unwrap_or_default();
    if let serde_json::Value::Object(map) = &first {
        let headers: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
        println!("{}", headers.join(","));

        for item in data {
            if let Ok(serde_json::Value::Object(row)) = serde_json::to_value(item) {
                let values: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        row.get(*h)
                            .map(|v| match v {
                                serde_json::Value::String(s) => escape_csv(s),
                                other => escape_csv(&other.to_string()),
                            })
                            .unwrap_or_default()
                    })
                    .collect();
                println!("{}", values.join(","));
            }
        }
    }
}

/// Escape a value for CSV output
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Status label, colored by outcome
pub fn colored_status(status: ScanStatus) -> String {
    match status {
        ScanStatus::Success => status.as_str().green().to_string(),
        ScanStatus::Failed => status.as_str().red().to_string(),
        ScanStatus::Detected => status.as_str().yellow().to_string(),
        ScanStatus::NoTraffic | ScanStatus::Unknown => status.as_str().dimmed().to_string(),
    }
}

/// One activity log line: `[HH:MM:SS] message`
pub fn format_log_entry(entry: &LogEntry) -> String {
    let time = entry.timestamp.format("%H:%M:%S").to_string();
    let message = match entry.level {
        LogLevel::Info => entry.message.normal(),
        LogLevel::Success => entry.message.green(),
        LogLevel::Error => entry.message.red(),
    };
    format!("[{}] {}", time.dimmed(), message)
}

// =============================================================================
// Display types for various commands
// =============================================================================

/// Live scan result display for scan command
#[derive(Debug, Tabled, Serialize)]
pub struct ResultRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    pub kind: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Detail")]
    pub detail: String,
}

impl ResultRow {
    pub fn new(index: usize, result: &ScanResult) -> Self {
        let detail = result
            .packet
            .as_ref()
            .or(result.details.as_ref())
            .or(result.error.as_ref())
            .cloned()
            .unwrap_or_default();

        Self {
            index,
            kind: result.kind.clone(),
            status: result.status.to_string(),
            detail,
        }
    }
}

/// Per-type count display for scan command
#[derive(Debug, Tabled, Serialize)]
pub struct CountRow {
    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    pub kind: String,
    #[tabled(rename = "Count")]
    pub count: usize,
}

/// Stored result display for history command
#[derive(Debug, Tabled, Serialize)]
pub struct HistoryRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Time")]
    pub timestamp: String,
    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    pub kind: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Details")]
    pub details: String,
}

impl From<StoredResult> for HistoryRow {
    fn from(row: StoredResult) -> Self {
        Self {
            id: row.id,
            timestamp: row.timestamp.unwrap_or_default(),
            kind: row.kind,
            status: row.status.to_string(),
            details: row.details.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_row_prefers_packet() {
        let result = ScanResult::new("sniff", ScanStatus::Detected)
            .with_packet("CAN(id=0x123)")
            .with_details("ignored");
        let row = ResultRow::new(1, &result);
        assert_eq!(row.detail, "CAN(id=0x123)");
        assert_eq!(row.status, "detected");
    }

    #[test]
    fn test_result_row_falls_back_to_error() {
        let result = ScanResult::new("scan", ScanStatus::Failed).with_error("bus off");
        assert_eq!(ResultRow::new(1, &result).detail, "bus off");
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
