//! Terminal collaborators for live scans
//!
//! Notifications go to stderr. Activity log entries are kept in a bounded log
//! and echoed as they arrive when the output is interactive.

use canscan_core::{
    ActivityLog, BoundedActivityLog, LogEntry, Notification, NotificationSink, Severity,
};
use colored::Colorize;

use crate::output::format_log_entry;

/// Prints notifications as one-line toasts on stderr
pub struct ConsoleNotifier {
    quiet: bool,
}

impl ConsoleNotifier {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl NotificationSink for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        // Errors are shown even in quiet mode
        if self.quiet && notification.severity != Severity::Error {
            return;
        }

        let badge = match notification.severity {
            Severity::Info => " INFO ".on_blue(),
            Severity::Success => " DONE ".on_green(),
            Severity::Warning => " WARN ".on_yellow(),
            Severity::Error => " FAIL ".on_red(),
        };
        eprintln!("{} {}", badge.bold(), notification.message);
    }
}

/// Activity log that echoes each entry to stdout
pub struct ConsoleActivityLog {
    entries: BoundedActivityLog,
    echo: bool,
}

impl ConsoleActivityLog {
    pub fn new(echo: bool) -> Self {
        Self {
            entries: BoundedActivityLog::default(),
            echo,
        }
    }

    /// Retained entries, newest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.entries()
    }
}

impl ActivityLog for ConsoleActivityLog {
    fn append(&self, entry: LogEntry) {
        if self.echo {
            println!("{}", format_log_entry(&entry));
        }
        self.entries.append(entry);
    }
}
