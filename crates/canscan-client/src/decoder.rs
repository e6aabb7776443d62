//! Frame decoder
//!
//! Turns raw transport frames into typed [`ScanEvent`]s. Decoding never fails:
//! anything that does not match the frame schema becomes
//! [`ScanEvent::DecodeFailure`] so one bad frame cannot abort a stream.
//!
//! Frame schema:
//!
//! ```text
//! {"event": "start",  "payload": {"interface": "vcan0", "simulate": true}}
//! {"event": "result", "payload": {"type": "sniff", "status": "detected", ...}}
//! {"event": "error",  "payload": {"error": "..."}}
//! {"event": "done"}
//! ```

use canscan_core::ScanResult;
use serde::Deserialize;
use serde_json::Value;

use crate::transport::RawFrame;

/// Message used when an error frame carries no text
const UNKNOWN_ERROR: &str = "unknown";

/// A decoded scan event
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// Backend acknowledged the scan
    Started { interface: String, simulate: bool },
    /// One finding
    Result(ScanResult),
    /// Protocol-level, non-fatal error reported by the backend
    Error(String),
    /// Scan finished
    Done,
    /// Frame that did not match the schema
    DecodeFailure { frame: RawFrame, reason: String },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StartPayload {
    #[serde(default)]
    interface: Option<String>,
    #[serde(default)]
    simulate: bool,
}

/// Stateless frame decoder
#[derive(Debug, Default, Clone, Copy)]
pub struct EventDecoder;

impl EventDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode one frame into exactly one event
    pub fn decode(&self, frame: &RawFrame) -> ScanEvent {
        match Self::try_decode(&frame.data) {
            Ok(event) => event,
            Err(reason) => ScanEvent::DecodeFailure {
                frame: frame.clone(),
                reason,
            },
        }
    }

    fn try_decode(data: &str) -> Result<ScanEvent, String> {
        let envelope: Envelope =
            serde_json::from_str(data).map_err(|e| format!("invalid frame: {}", e))?;

        match envelope.event.as_str() {
            "result" => {
                let payload = envelope
                    .payload
                    .filter(Value::is_object)
                    .ok_or_else(|| "result frame without payload".to_string())?;
                serde_json::from_value::<ScanResult>(payload)
                    .map(ScanEvent::Result)
                    .map_err(|e| format!("invalid result payload: {}", e))
            }
            "error" => {
                let message = envelope
                    .payload
                    .and_then(|p| serde_json::from_value::<ErrorPayload>(p).ok())
                    .and_then(|p| p.error)
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
                Ok(ScanEvent::Error(message))
            }
            "done" => Ok(ScanEvent::Done),
            "start" => {
                let payload = envelope
                    .payload
                    .and_then(|p| serde_json::from_value::<StartPayload>(p).ok());
                Ok(ScanEvent::Started {
                    interface: payload
                        .as_ref()
                        .and_then(|p| p.interface.clone())
                        .unwrap_or_default(),
                    simulate: payload.map(|p| p.simulate).unwrap_or(false),
                })
            }
            other => Err(format!("unknown event: {}", other)),
        }
    }
}
