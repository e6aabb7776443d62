//! Test utilities for canscan-client
//!
//! - [`TestServer`]: serve an axum router on an ephemeral port with a client
//!   pointed at it
//! - [`ScriptedTransportFactory`]: in-memory transports fed by the test, with
//!   counters for created, open and closed sessions
//! - Recording collaborators that keep every notification, log entry and
//!   report fetch for later assertions

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use canscan_core::{
    ActivityLog, LogEntry, LogLevel, Notification, NotificationSink, ReportError, ReportResult,
    ReportService, ScanRequest, Severity, TransportKind,
};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::transport::{
    RawFrame, TransportError, TransportFactory, TransportResult, TransportSession,
};
use crate::{Result, ScanClient};

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: ScanClient,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Create a new test server from an axum Router
    ///
    /// # Example
    ///
    /// ```ignore
    /// use canscan_client::testing::TestServer;
    /// use canscan_mockd::{create_router, MockState};
    ///
    /// let server = TestServer::start(create_router(MockState::default())).await?;
    /// let report = server.client.get_report().await?;
    /// ```
    pub async fn start<S>(router: axum::Router<S>) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        Self::start_with_timeout(router, Duration::from_secs(5), Duration::from_secs(2)).await
    }

    /// Create a new test server with custom timeouts
    pub async fn start_with_timeout<S>(
        router: axum::Router<S>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let router: axum::Router = router.into();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let base_url = format!("http://{}", addr);
        let client = ScanClient::with_config(&base_url, timeout, connect_timeout)?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

// =============================================================================
// Scripted transport
// =============================================================================

/// One step delivered by a scripted session
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Deliver a raw frame
    Frame(String),
    /// Fail the connection
    Fail(TransportError),
}

/// Counters shared by all sessions of a [`ScriptedTransportFactory`]
#[derive(Debug, Default)]
pub struct TransportStats {
    created: AtomicUsize,
    opened: AtomicUsize,
    open_now: AtomicUsize,
    close_calls: AtomicUsize,
}

impl TransportStats {
    /// Sessions handed out by the factory
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Successful `open()` calls
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Sessions currently open
    pub fn open_now(&self) -> usize {
        self.open_now.load(Ordering::SeqCst)
    }

    /// Every `close()` call, including redundant ones
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

/// Transport factory whose sessions replay a script and then wait for more
/// steps pushed by the test
///
/// Sessions never end on their own: the factory keeps a feeder for every
/// session, so a session only stops on a `Fail` step, a cancel or a close.
#[derive(Default)]
pub struct ScriptedTransportFactory {
    script: Mutex<Vec<ScriptStep>>,
    open_error: Mutex<Option<TransportError>>,
    feeders: Mutex<Vec<mpsc::UnboundedSender<ScriptStep>>>,
    stats: Arc<TransportStats>,
}

impl ScriptedTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the given frames in every new session
    pub fn with_frames<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let factory = Self::new();
        *factory.script.lock() = frames
            .into_iter()
            .map(|f| ScriptStep::Frame(f.into()))
            .collect();
        factory
    }

    /// Append a step to the script replayed by new sessions
    pub fn then(self, step: ScriptStep) -> Self {
        self.script.lock().push(step);
        self
    }

    /// Make `open()` fail for new sessions
    pub fn fail_open(self, error: TransportError) -> Self {
        *self.open_error.lock() = Some(error);
        self
    }

    pub fn stats(&self) -> Arc<TransportStats> {
        self.stats.clone()
    }

    /// Push a frame to the most recently created session
    pub fn push_frame(&self, frame: impl Into<String>) {
        self.push(ScriptStep::Frame(frame.into()));
    }

    /// Push a step to the most recently created session
    pub fn push(&self, step: ScriptStep) {
        if let Some(feeder) = self.feeders.lock().last() {
            let _ = feeder.send(step);
        }
    }
}

impl TransportFactory for ScriptedTransportFactory {
    fn create(&self, kind: TransportKind) -> Box<dyn TransportSession> {
        let (tx, rx) = mpsc::unbounded_channel();
        for step in self.script.lock().iter() {
            let _ = tx.send(step.clone());
        }
        self.feeders.lock().push(tx);
        self.stats.created.fetch_add(1, Ordering::SeqCst);

        Box::new(ScriptedSession {
            kind,
            steps: rx,
            open_error: self.open_error.lock().clone(),
            stats: self.stats.clone(),
            open: false,
            closed: false,
        })
    }
}

struct ScriptedSession {
    kind: TransportKind,
    steps: mpsc::UnboundedReceiver<ScriptStep>,
    open_error: Option<TransportError>,
    stats: Arc<TransportStats>,
    open: bool,
    closed: bool,
}

impl ScriptedSession {
    fn shut(&mut self) {
        self.closed = true;
        if self.open {
            self.open = false;
            self.stats.open_now.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl TransportSession for ScriptedSession {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn open(&mut self, _request: &ScanRequest) -> TransportResult<()> {
        if let Some(error) = self.open_error.take() {
            self.closed = true;
            return Err(error);
        }
        self.open = true;
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        self.stats.open_now.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<TransportResult<RawFrame>> {
        if self.closed {
            return None;
        }
        match self.steps.recv().await {
            Some(ScriptStep::Frame(data)) => Some(Ok(RawFrame::new(data))),
            Some(ScriptStep::Fail(error)) => {
                self.shut();
                Some(Err(error))
            }
            None => {
                self.shut();
                Some(Err(TransportError::ConnectionClosed))
            }
        }
    }

    async fn close(&mut self) {
        self.stats.close_calls.fetch_add(1, Ordering::SeqCst);
        if !self.closed {
            self.shut();
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

// =============================================================================
// Recording collaborators
// =============================================================================

/// Notification sink that keeps every notification
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.notifications
            .lock()
            .iter()
            .filter(|n| n.severity == severity)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.lock().is_empty()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().push(notification);
    }
}

/// Activity log that keeps every entry in arrival order
#[derive(Debug, Default)]
pub struct RecordingActivityLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.message.clone()).collect()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .count()
    }
}

impl ActivityLog for RecordingActivityLog {
    fn append(&self, entry: LogEntry) {
        self.entries.lock().push(entry);
    }
}

/// Report service that serves a fixed report and counts fetches
#[derive(Debug)]
pub struct StaticReportService {
    report: Option<String>,
    calls: AtomicUsize,
}

impl StaticReportService {
    pub fn new(report: impl Into<String>) -> Self {
        Self {
            report: Some(report.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A service whose fetches always fail
    pub fn unavailable() -> Self {
        Self {
            report: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportService for StaticReportService {
    async fn fetch(&self) -> ReportResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.report
            .clone()
            .ok_or_else(|| ReportError::Unreachable("report service offline".to_string()))
    }
}

/// Poll a condition until it holds or the timeout expires
pub async fn wait_for<F>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    false
}
