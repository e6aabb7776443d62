//! Scan request models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Bus interface used when none is configured
pub const DEFAULT_INTERFACE: &str = "vcan0";

/// Push transport used to deliver live scan frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// One-way server push (Server-Sent Events)
    #[default]
    Stream,
    /// Bidirectional socket (WebSocket)
    Socket,
}

impl TransportKind {
    /// Short lowercase label, as used in config files and CLI flags
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Socket => "socket",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stream" | "sse" => Ok(Self::Stream),
            "socket" | "ws" | "websocket" => Ok(Self::Socket),
            other => Err(format!("Unknown transport: {}", other)),
        }
    }
}

/// Parameters of one live scan
///
/// Immutable once a session has been started with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Bus interface to scan (e.g. `vcan0`)
    #[serde(rename = "interface")]
    pub interface_name: String,
    /// Produce synthetic results instead of touching the bus
    pub simulate: bool,
    /// Transport used to stream results
    #[serde(default)]
    pub transport: TransportKind,
}

impl ScanRequest {
    /// Create a request for the given interface over the given transport
    pub fn new(interface_name: impl Into<String>, transport: TransportKind) -> Self {
        Self {
            interface_name: interface_name.into(),
            simulate: false,
            transport,
        }
    }

    /// Set the simulate flag
    pub fn with_simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    /// Query-string value of the simulate flag (`1` or `0`)
    pub fn simulate_flag(&self) -> &'static str {
        if self.simulate {
            "1"
        } else {
            "0"
        }
    }
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self::new(DEFAULT_INTERFACE, TransportKind::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_kind_parse() {
        assert_eq!("stream".parse::<TransportKind>(), Ok(TransportKind::Stream));
        assert_eq!("SSE".parse::<TransportKind>(), Ok(TransportKind::Stream));
        assert_eq!("ws".parse::<TransportKind>(), Ok(TransportKind::Socket));
        assert!("carrier-pigeon".parse::<TransportKind>().is_err());
    }

    #[test]
    fn test_simulate_flag() {
        let request = ScanRequest::default();
        assert_eq!(request.interface_name, "vcan0");
        assert_eq!(request.simulate_flag(), "0");
        assert_eq!(request.with_simulate(true).simulate_flag(), "1");
    }
}
