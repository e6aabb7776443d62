//! Scan session state and the effect executor

use std::collections::HashMap;
use std::sync::Arc;

use canscan_core::{
    ActivityLog, LogEntry, Notification, NotificationSink, ReportService, ScanRequest,
    ScanResult, ScanStatus, TransportKind,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use super::machine::{transition, Effect, ScanInput, ScanState};
use crate::aggregator::ResultAggregator;

/// The outside world as seen by a controller
pub(crate) struct Collaborators {
    pub notifier: Arc<dyn NotificationSink>,
    pub activity: Arc<dyn ActivityLog>,
    pub reports: Arc<dyn ReportService>,
    pub report_tx: Arc<watch::Sender<Option<String>>>,
}

impl Collaborators {
    /// Run the collaborator calls of one applied input
    ///
    /// Must be called without the session lock held: sinks and logs are free
    /// to call back into the controller.
    pub fn dispatch(&self, session_id: Uuid, calls: Vec<Effect>) {
        for effect in calls {
            match effect {
                Effect::Log(level, message) => {
                    self.activity.append(LogEntry::now(level, message));
                }
                Effect::Notify(severity, message) => {
                    self.notifier.notify(Notification::new(severity, message));
                }
                Effect::FetchReport => self.spawn_report_fetch(session_id),
                Effect::AppendResult(_)
                | Effect::CountDroppedFrame { .. }
                | Effect::CloseTransport => {}
            }
        }
    }

    fn spawn_report_fetch(&self, session_id: Uuid) {
        let reports = self.reports.clone();
        let report_tx = self.report_tx.clone();

        tokio::spawn(async move {
            match reports.fetch().await {
                Ok(report) => {
                    debug!(%session_id, bytes = report.len(), "Report refreshed");
                    report_tx.send_replace(Some(report));
                }
                Err(e) => {
                    warn!(%session_id, "Report fetch failed: {}", e);
                }
            }
        });
    }
}

/// One live scan, owned by a controller
#[derive(Debug)]
pub(crate) struct ScanSession {
    pub id: Uuid,
    pub request: ScanRequest,
    pub state: ScanState,
    aggregator: ResultAggregator,
    dropped_frames: u64,
    started_at: DateTime<Utc>,
}

/// What happened when an input was applied
#[derive(Debug, Default)]
pub(crate) struct Applied {
    /// The state changed
    pub changed: bool,
    /// The transport must be closed
    pub close_transport: bool,
    /// Log, notify and report calls, in order, for [`Collaborators::dispatch`]
    pub calls: Vec<Effect>,
}

impl ScanSession {
    pub fn new(request: ScanRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            state: ScanState::Connecting,
            aggregator: ResultAggregator::new(),
            dropped_frames: 0,
            started_at: Utc::now(),
        }
    }

    /// Run the state machine for one input and apply its effects to the session
    ///
    /// The state and the results are updated before this returns. Calls to the
    /// collaborators are handed back in [`Applied::calls`] so they can run once
    /// the session lock is released.
    pub fn apply(&mut self, input: ScanInput) -> Applied {
        let (next, effects) = transition(self.state, input);
        let mut applied = Applied::default();

        if next != self.state {
            debug!(session_id = %self.id, from = %self.state, to = %next, "Scan state changed");
            self.state = next;
            applied.changed = true;
        }

        for effect in effects {
            match effect {
                Effect::AppendResult(result) => self.aggregator.append(result),
                Effect::CountDroppedFrame { reason } => {
                    self.dropped_frames += 1;
                    warn!(
                        session_id = %self.id,
                        dropped = self.dropped_frames,
                        "Dropping undecodable frame: {}",
                        reason
                    );
                }
                Effect::CloseTransport => applied.close_transport = true,
                call @ (Effect::Log(..) | Effect::Notify(..) | Effect::FetchReport) => {
                    applied.calls.push(call)
                }
            }
        }

        applied
    }

    /// Copy of the session's current contents
    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            id: self.id,
            interface: self.request.interface_name.clone(),
            simulate: self.request.simulate,
            transport: self.request.transport,
            state: self.state,
            results: self.aggregator.all().to_vec(),
            counts_by_type: self.aggregator.counts_by_type().clone(),
            counts_by_status: self.aggregator.counts_by_status().clone(),
            dropped_frames: self.dropped_frames,
            started_at: self.started_at,
        }
    }

    /// Move the contents out, leaving the session empty
    pub fn take_summary(&mut self) -> ScanSummary {
        let (results, counts_by_type, counts_by_status) =
            std::mem::take(&mut self.aggregator).into_parts();

        ScanSummary {
            id: self.id,
            interface: self.request.interface_name.clone(),
            simulate: self.request.simulate,
            transport: self.request.transport,
            state: self.state,
            results,
            counts_by_type,
            counts_by_status,
            dropped_frames: self.dropped_frames,
            started_at: self.started_at,
        }
    }
}

/// Contents of a scan session, live or final
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub id: Uuid,
    pub interface: String,
    pub simulate: bool,
    pub transport: TransportKind,
    pub state: ScanState,
    /// Results in arrival order
    pub results: Vec<ScanResult>,
    pub counts_by_type: HashMap<String, usize>,
    pub counts_by_status: HashMap<ScanStatus, usize>,
    /// Frames that could not be decoded
    pub dropped_frames: u64,
    pub started_at: DateTime<Utc>,
}

impl ScanSummary {
    /// Number of results of a given type
    pub fn count_type(&self, kind: &str) -> usize {
        self.counts_by_type.get(kind).copied().unwrap_or(0)
    }

    /// Number of results with a given status
    pub fn count_status(&self, status: ScanStatus) -> usize {
        self.counts_by_status.get(&status).copied().unwrap_or(0)
    }
}
