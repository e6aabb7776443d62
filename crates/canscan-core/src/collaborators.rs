//! Collaborator traits - how a scan controller reaches the outside world
//!
//! Notification and logging calls are synchronous and must return quickly; a
//! controller invokes them while holding its session lock. Report fetches are
//! asynchronous and run decoupled from event processing.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::ReportResult;
use crate::models::{LogEntry, Notification};

/// Receives toast notifications
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Receives activity log entries
pub trait ActivityLog: Send + Sync {
    fn append(&self, entry: LogEntry);
}

/// Fetches the rendered report from the scanning backend
#[async_trait]
pub trait ReportService: Send + Sync {
    /// Fetch the latest report (markdown)
    async fn fetch(&self) -> ReportResult<String>;
}

/// Default number of entries kept by [`BoundedActivityLog`]
pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// In-memory activity log keeping the newest entries first
#[derive(Debug)]
pub struct BoundedActivityLog {
    capacity: usize,
    entries: RwLock<VecDeque<LogEntry>>,
}

impl BoundedActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Snapshot of the entries, newest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for BoundedActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl ActivityLog for BoundedActivityLog {
    fn append(&self, entry: LogEntry) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.write();
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogLevel;

    #[test]
    fn test_newest_first() {
        let log = BoundedActivityLog::default();
        log.append(LogEntry::now(LogLevel::Info, "first"));
        log.append(LogEntry::now(LogLevel::Success, "second"));

        let entries = log.entries();
        assert_eq!(entries[0].message, "second");
        assert_eq!(entries[1].message, "first");
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let log = BoundedActivityLog::new(3);
        for i in 0..5 {
            log.append(LogEntry::now(LogLevel::Info, format!("entry {}", i)));
        }

        let messages: Vec<_> = log.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["entry 4", "entry 3", "entry 2"]);
    }
}
