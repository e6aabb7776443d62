//! Live scan controller
//!
//! [`ScanController`] owns at most one live scan at a time. Starting a scan
//! spawns a driver task that opens the requested transport, decodes each frame
//! and feeds it through the state machine in [`machine`]. The driver is the
//! only consumer of the transport, so frames are applied strictly in arrival
//! order and one at a time.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use canscan_client::transport::HttpTransportFactory;
//! use canscan_client::{ScanClient, ScanController};
//! use canscan_core::{BoundedActivityLog, Notification, NotificationSink, ScanRequest, TransportKind};
//!
//! struct Toasts;
//!
//! impl NotificationSink for Toasts {
//!     fn notify(&self, notification: Notification) {
//!         println!("{:?}: {}", notification.severity, notification.message);
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ScanClient::new("http://localhost:8000")?;
//! let controller = ScanController::new(
//!     Arc::new(HttpTransportFactory::new(client.clone())),
//!     Arc::new(Toasts),
//!     Arc::new(BoundedActivityLog::default()),
//!     Arc::new(client),
//! );
//!
//! let request = ScanRequest::new("vcan0", TransportKind::Socket).with_simulate(true);
//! let handle = controller.start(request)?;
//! let summary = handle.wait().await?;
//! println!("{} results, state {}", summary.results.len(), summary.state);
//! # Ok(())
//! # }
//! ```

pub mod machine;
mod session;

pub use machine::{Effect, ScanInput, ScanState};
pub use session::ScanSummary;

use std::sync::Arc;

use canscan_core::{ActivityLog, NotificationSink, ReportService, ScanRequest};
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use self::session::{Collaborators, ScanSession};
use crate::decoder::EventDecoder;
use crate::error::ControllerError;
use crate::transport::{TransportError, TransportFactory, TransportSession};

/// The live scan slot of a controller
struct ActiveScan {
    id: Uuid,
    session: Arc<Mutex<ScanSession>>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

/// Orchestrates live scans against the scan backend
///
/// Each controller is independent; several can exist side by side (for
/// example in tests). Dropping a controller cancels its live scan.
pub struct ScanController {
    transports: Arc<dyn TransportFactory>,
    collaborators: Arc<Collaborators>,
    active: Arc<Mutex<Option<ActiveScan>>>,
}

impl ScanController {
    pub fn new(
        transports: Arc<dyn TransportFactory>,
        notifier: Arc<dyn NotificationSink>,
        activity: Arc<dyn ActivityLog>,
        reports: Arc<dyn ReportService>,
    ) -> Self {
        let (report_tx, _) = watch::channel(None);

        Self {
            transports,
            collaborators: Arc::new(Collaborators {
                notifier,
                activity,
                reports,
                report_tx: Arc::new(report_tx),
            }),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a live scan
    ///
    /// Fails with [`ControllerError::ScanInProgress`] while another scan is
    /// connecting or streaming; no transport is created in that case. All
    /// later failures are reported through the collaborators and the
    /// returned handle, never as an error here.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, request: ScanRequest) -> Result<ScanHandle, ControllerError> {
        let mut active = self.active.lock();

        if let Some(current) = active.as_ref() {
            if !current.session.lock().state.is_terminal() {
                warn!(session_id = %current.id, "Rejecting scan start: a scan is already live");
                return Err(ControllerError::ScanInProgress(current.id));
            }
        }

        let session = ScanSession::new(request.clone());
        let id = session.id;
        let session = Arc::new(Mutex::new(session));
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let transport = self.transports.create(request.transport);

        info!(
            session_id = %id,
            interface = %request.interface_name,
            simulate = request.simulate,
            transport = %request.transport,
            "Starting live scan"
        );

        *active = Some(ActiveScan {
            id,
            session: session.clone(),
            cancel_tx: Some(cancel_tx),
        });
        drop(active);

        let driver = Driver {
            id,
            request,
            session,
            transport,
            transport_closed: false,
            decoder: EventDecoder::new(),
            collaborators: self.collaborators.clone(),
            active: self.active.clone(),
        };
        let join = tokio::spawn(driver.run(cancel_rx));

        Ok(ScanHandle { id, join })
    }

    /// Cancel the live scan, if any
    ///
    /// The session becomes `Cancelled` before this returns; frames already in
    /// flight are discarded without effect. Returns `true` if this call did
    /// the cancelling. Calling it again is a no-op.
    pub fn cancel(&self) -> bool {
        let mut active = self.active.lock();
        let Some(current) = active.as_mut() else {
            return false;
        };
        let id = current.id;

        let applied = current.session.lock().apply(ScanInput::Cancel);

        if applied.close_transport {
            if let Some(cancel_tx) = current.cancel_tx.take() {
                let _ = cancel_tx.send(());
            }
        }
        drop(active);

        self.collaborators.dispatch(id, applied.calls);
        if applied.changed {
            info!(session_id = %id, "Live scan cancelled");
        }
        applied.changed
    }

    /// State of the current session, or `Idle` when there is none
    pub fn state(&self) -> ScanState {
        self.active
            .lock()
            .as_ref()
            .map(|current| current.session.lock().state)
            .unwrap_or_default()
    }

    /// Whether a scan is connecting or streaming
    pub fn is_scanning(&self) -> bool {
        self.state().is_live()
    }

    /// Copy of the current session's results and counts
    pub fn snapshot(&self) -> Option<ScanSummary> {
        self.active
            .lock()
            .as_ref()
            .map(|current| current.session.lock().summary())
    }

    /// Most recently fetched report
    pub fn report(&self) -> Option<String> {
        self.collaborators.report_tx.borrow().clone()
    }

    /// Watch report refreshes
    pub fn subscribe_report(&self) -> watch::Receiver<Option<String>> {
        self.collaborators.report_tx.subscribe()
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for ScanController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("state", &self.state())
            .finish()
    }
}

/// Handle to a started scan
#[derive(Debug)]
pub struct ScanHandle {
    id: Uuid,
    join: JoinHandle<ScanSummary>,
}

impl ScanHandle {
    /// Session ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the scan to reach a terminal state and be released
    pub async fn wait(self) -> Result<ScanSummary, ControllerError> {
        self.join
            .await
            .map_err(|e| ControllerError::DriverFailed(e.to_string()))
    }
}

/// Task that pumps one transport into one session
struct Driver {
    id: Uuid,
    request: ScanRequest,
    session: Arc<Mutex<ScanSession>>,
    transport: Box<dyn TransportSession>,
    transport_closed: bool,
    decoder: EventDecoder,
    collaborators: Arc<Collaborators>,
    active: Arc<Mutex<Option<ActiveScan>>>,
}

impl Driver {
    async fn run(mut self, mut cancel_rx: oneshot::Receiver<()>) -> ScanSummary {
        let opened = tokio::select! {
            biased;
            _ = &mut cancel_rx => None,
            result = self.transport.open(&self.request) => Some(result),
        };

        match opened {
            Some(Ok(())) => {
                let kind = self.transport.kind();
                self.apply(ScanInput::Opened(kind)).await;
            }
            Some(Err(e)) => {
                warn!(session_id = %self.id, "Failed to open transport: {}", e);
                self.apply(ScanInput::ConnectionError(e.to_string())).await;
            }
            None => {
                self.apply(ScanInput::Cancel).await;
            }
        }

        while !self.is_terminal() {
            let input = tokio::select! {
                biased;
                _ = &mut cancel_rx => ScanInput::Cancel,
                signal = self.transport.next_frame() => match signal {
                    Some(Ok(frame)) => ScanInput::Event(self.decoder.decode(&frame)),
                    Some(Err(e)) => ScanInput::ConnectionError(e.to_string()),
                    None => ScanInput::ConnectionError(TransportError::ConnectionClosed.to_string()),
                },
            };
            self.apply(input).await;
        }

        self.close_transport().await;
        self.release()
    }

    fn is_terminal(&self) -> bool {
        self.session.lock().state.is_terminal()
    }

    async fn apply(&mut self, input: ScanInput) {
        let applied = self.session.lock().apply(input);
        self.collaborators.dispatch(self.id, applied.calls);
        if applied.close_transport {
            self.close_transport().await;
        }
    }

    async fn close_transport(&mut self) {
        if self.transport_closed {
            return;
        }
        self.transport_closed = true;
        self.transport.close().await;
        debug!(session_id = %self.id, "Transport closed");
    }

    /// Hand the session's contents to the caller and free the controller slot
    fn release(self) -> ScanSummary {
        let summary = self.session.lock().take_summary();

        let mut active = self.active.lock();
        if active.as_ref().map(|current| current.id) == Some(self.id) {
            *active = None;
        }
        drop(active);

        info!(
            session_id = %self.id,
            state = %summary.state,
            results = summary.results.len(),
            dropped_frames = summary.dropped_frames,
            "Live scan finished"
        );
        summary
    }
}
