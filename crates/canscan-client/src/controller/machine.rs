//! Live scan state machine
//!
//! [`transition`] is a pure function from the current state and one input to
//! the next state and the effects to perform. It holds no I/O, so every row of
//! the transition table can be tested without a transport.
//!
//! ```text
//! Idle -> Connecting -> Streaming -> Completed
//!              \             \----> Failed
//!               \------------------> Cancelled
//! ```

use std::fmt;

use canscan_core::{LogLevel, ScanResult, Severity, TransportKind};
use serde::Serialize;

use crate::decoder::ScanEvent;

/// Lifecycle state of a scan session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    #[default]
    Idle,
    Connecting,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl ScanState {
    /// Completed, Failed and Cancelled are final
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Connecting or Streaming
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Connecting | Self::Streaming)
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Something that happened to a session
#[derive(Debug, Clone, PartialEq)]
pub enum ScanInput {
    /// The transport finished opening
    Opened(TransportKind),
    /// A decoded frame
    Event(ScanEvent),
    /// The transport failed
    ConnectionError(String),
    /// The user cancelled the scan
    Cancel,
}

/// A side effect requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    AppendResult(ScanResult),
    CountDroppedFrame { reason: String },
    Log(LogLevel, String),
    Notify(Severity, String),
    CloseTransport,
    FetchReport,
}

/// Apply one input to a state
///
/// Inputs arriving in a terminal state are ignored, which keeps late frames
/// racing a `Done`, an error or a cancel from producing any effect.
pub fn transition(state: ScanState, input: ScanInput) -> (ScanState, Vec<Effect>) {
    if state.is_terminal() {
        return (state, Vec::new());
    }

    match input {
        ScanInput::Cancel => match state {
            ScanState::Idle => (state, Vec::new()),
            _ => (ScanState::Cancelled, vec![Effect::CloseTransport]),
        },

        ScanInput::ConnectionError(message) => match state {
            ScanState::Idle => (state, Vec::new()),
            _ => (
                ScanState::Failed,
                vec![
                    Effect::CloseTransport,
                    Effect::Notify(Severity::Error, "Live scan connection error".to_string()),
                    Effect::Log(LogLevel::Error, format!("Connection error: {}", message)),
                ],
            ),
        },

        ScanInput::Opened(kind) => match state {
            ScanState::Connecting => (
                state,
                vec![Effect::Log(LogLevel::Info, format!("{} connected", label(kind)))],
            ),
            _ => (state, Vec::new()),
        },

        ScanInput::Event(event) => {
            if state == ScanState::Idle {
                return (state, Vec::new());
            }
            apply_event(event, state)
        }
    }
}

fn apply_event(event: ScanEvent, state: ScanState) -> (ScanState, Vec<Effect>) {
    match event {
        // Noise never moves the state, not even out of Connecting
        ScanEvent::DecodeFailure { reason, .. } => {
            (state, vec![Effect::CountDroppedFrame { reason }])
        }

        ScanEvent::Started {
            interface,
            simulate,
        } => (
            ScanState::Streaming,
            vec![Effect::Log(
                LogLevel::Info,
                format!("Live scan started on {} (simulate={})", interface, simulate),
            )],
        ),

        ScanEvent::Result(result) => {
            let entry = Effect::Log(
                LogLevel::for_status(result.status),
                format!("Result: {} ({})", result.kind, result.status),
            );
            (
                ScanState::Streaming,
                vec![Effect::AppendResult(result), entry],
            )
        }

        ScanEvent::Error(message) => (
            ScanState::Streaming,
            vec![
                Effect::Log(LogLevel::Error, format!("Error: {}", message)),
                Effect::Notify(Severity::Error, "Live scan error".to_string()),
            ],
        ),

        ScanEvent::Done => (
            ScanState::Completed,
            vec![
                Effect::CloseTransport,
                Effect::FetchReport,
                Effect::Notify(Severity::Success, "Live scan finished".to_string()),
                Effect::Log(LogLevel::Success, "Live scan finished".to_string()),
            ],
        ),
    }
}

fn label(kind: TransportKind) -> &'static str {
    match kind {
        TransportKind::Stream => "Event stream",
        TransportKind::Socket => "WebSocket",
    }
}
