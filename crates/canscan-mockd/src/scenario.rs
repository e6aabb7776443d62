//! Frame sequences played on a live scan connection

use canscan_core::{ScanResult, ScanStatus, TransportKind, DEFAULT_INTERFACE};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::error::{MockError, Result};
use crate::state::MockState;

/// Query parameters of both live scan endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ScanQuery {
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(default)]
    pub simulate: Option<String>,
}

impl ScanQuery {
    /// Interface to scan, defaulting to `vcan0` when absent
    pub fn interface(&self) -> Result<String> {
        match self.interface.as_deref() {
            None => Ok(DEFAULT_INTERFACE.to_string()),
            Some(name) if name.trim().is_empty() => {
                Err(MockError::BadRequest("interface must not be empty".to_string()))
            }
            Some(name) => Ok(name.trim().to_string()),
        }
    }

    /// `1` and `true` (any case) enable simulation
    pub fn simulate(&self) -> bool {
        self.simulate
            .as_deref()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// One frame to send, plus the result to store when it goes out
#[derive(Debug, Clone)]
pub struct PlannedFrame {
    pub data: String,
    pub record: Option<ScanResult>,
}

impl PlannedFrame {
    fn raw(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            record: None,
        }
    }

    fn result(result: ScanResult) -> Self {
        let data = json!({ "event": "result", "payload": result }).to_string();
        Self {
            data,
            record: Some(result),
        }
    }

    fn error(result: ScanResult) -> Self {
        let data = json!({ "event": "error", "payload": result }).to_string();
        Self {
            data,
            record: Some(result),
        }
    }

    fn done() -> Self {
        Self::raw(json!({ "event": "done" }).to_string())
    }

    /// Store the frame's result, if any
    pub fn commit(&self, state: &MockState) {
        if let Some(result) = &self.record {
            state.record(result);
        }
    }
}

/// Synthetic findings for simulated scans
pub fn simulated_results(interface: &str) -> Vec<ScanResult> {
    let now = Utc::now().timestamp();
    vec![
        ScanResult::new("sniff", ScanStatus::Detected)
            .with_packet(format!("CAN(id=0x123, data=01020304, t={})", now)),
        ScanResult::new("sniff", ScanStatus::Detected)
            .with_packet(format!("CAN(id=0x456, data=11223344, t={})", now)),
        ScanResult::new("inject", ScanStatus::Success)
            .with_details(format!("Injected test frame on {}", interface)),
    ]
}

/// Frames for one live scan
///
/// A configured script wins over everything else. Without one, simulated
/// scans stream the synthetic findings and finish with `done`. Real scans
/// fail because the mock has no bus: the stream variant still sends `done`
/// after the error, while the socket variant hangs up without it.
pub fn plan(
    state: &MockState,
    interface: &str,
    simulate: bool,
    transport: TransportKind,
) -> Vec<PlannedFrame> {
    if let Some(script) = &state.config().script {
        return script.iter().cloned().map(PlannedFrame::raw).collect();
    }

    let mut frames = vec![PlannedFrame::raw(
        json!({
            "event": "start",
            "payload": { "interface": interface, "simulate": simulate },
        })
        .to_string(),
    )];

    if simulate {
        frames.extend(simulated_results(interface).into_iter().map(PlannedFrame::result));
        frames.push(PlannedFrame::done());
        return frames;
    }

    let failure = ScanResult::new("scan", ScanStatus::Failed)
        .with_error(format!("CAN interface {} is not available", interface));
    frames.push(PlannedFrame::error(failure));

    if transport == TransportKind::Stream {
        frames.push(PlannedFrame::done());
    }
    frames
}
