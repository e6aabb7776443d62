//! Activity log models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ScanStatus;

/// Severity of an activity log entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Success,
    Error,
}

impl LogLevel {
    /// Level used when logging a result with the given status
    pub fn for_status(status: ScanStatus) -> Self {
        match status {
            ScanStatus::Success => Self::Success,
            ScanStatus::Failed => Self::Error,
            _ => Self::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// One line of the user-visible activity log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    #[serde(rename = "msg")]
    pub message: String,
}

impl LogEntry {
    /// Create an entry stamped with the current time
    pub fn now(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }
}
