//! Scan result models

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Category used when a result carries no type
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Outcome of a single scan step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Traffic or a weakness was detected
    Detected,
    /// An attack step succeeded
    Success,
    /// An attack step failed
    Failed,
    /// Nothing was seen on the bus
    NoTraffic,
    /// Missing or unrecognized status
    #[default]
    Unknown,
}

impl ScanStatus {
    /// Parse a status string, ignoring case. Unrecognized values map to `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "detected" => Self::Detected,
            "success" => Self::Success,
            "failed" => Self::Failed,
            "no_traffic" => Self::NoTraffic,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detected => "detected",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::NoTraffic => "no_traffic",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ScanStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::parse).unwrap_or_default())
    }
}

/// A single finding reported by the scanning backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Scan step that produced the result (`sniff`, `inject`, ...)
    ///
    /// Missing on some backend payloads; such results count as `unknown`.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub status: ScanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Captured frame, rendered by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResult {
    /// Create a result with no payload strings
    pub fn new(kind: impl Into<String>, status: ScanStatus) -> Self {
        Self {
            kind: kind.into(),
            status,
            details: None,
            packet: None,
            error: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_packet(mut self, packet: impl Into<String>) -> Self {
        self.packet = Some(packet.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Category key used for per-type counts
    pub fn category(&self) -> &str {
        let kind = self.kind.trim();
        if kind.is_empty() {
            UNKNOWN_CATEGORY
        } else {
            kind
        }
    }
}

/// A result row as kept by the external results store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResult {
    pub id: i64,
    /// Store-assigned timestamp, passed through verbatim
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub status: ScanStatus,
    #[serde(default)]
    pub details: Option<String>,
}

/// Response body of `GET /api/results`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredResultList {
    pub results: Vec<StoredResult>,
}

/// Response body of `DELETE /api/results`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearedResults {
    pub cleared: u64,
}

/// Response body of `GET /api/report`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDocument {
    /// Markdown report text
    pub report: String,
}
