//! Controller tests over scripted in-memory transports
//!
//! Every scan here runs through the real driver task and state machine; only
//! the transport and the collaborators are replaced.

use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use canscan_client::testing::{
    wait_for, RecordingActivityLog, RecordingNotifier, ScriptStep, ScriptedTransportFactory,
    StaticReportService,
};
use canscan_client::transport::TransportError;
use canscan_client::{ControllerError, ScanController, ScanState};
use canscan_core::{
    ActivityLog, LogEntry, LogLevel, Notification, NotificationSink, ScanRequest, ScanStatus,
    Severity, TransportKind,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

const START: &str = r#"{"event":"start","payload":{"interface":"vcan0","simulate":true}}"#;
const SNIFF: &str = r#"{"event":"result","payload":{"type":"sniff","status":"detected","packet":"CAN(id=0x123, data=01020304)"}}"#;
const INJECT: &str = r#"{"event":"result","payload":{"type":"inject","status":"success","details":"Injected test frame on vcan0"}}"#;
const DONE: &str = r#"{"event":"done"}"#;

struct Harness {
    transports: Arc<ScriptedTransportFactory>,
    notifier: Arc<RecordingNotifier>,
    activity: Arc<RecordingActivityLog>,
    reports: Arc<StaticReportService>,
    controller: ScanController,
}

impl Harness {
    fn new(transports: ScriptedTransportFactory) -> Self {
        Self::with_reports(transports, StaticReportService::new("# Report"))
    }

    fn with_reports(transports: ScriptedTransportFactory, reports: StaticReportService) -> Self {
        let transports = Arc::new(transports);
        let notifier = Arc::new(RecordingNotifier::new());
        let activity = Arc::new(RecordingActivityLog::new());
        let reports = Arc::new(reports);

        let controller = ScanController::new(
            transports.clone(),
            notifier.clone(),
            activity.clone(),
            reports.clone(),
        );

        Self {
            transports,
            notifier,
            activity,
            reports,
            controller,
        }
    }
}

fn request() -> ScanRequest {
    ScanRequest::new("vcan0", TransportKind::Socket).with_simulate(true)
}

fn sniff(n: usize) -> String {
    format!(
        r#"{{"event":"result","payload":{{"type":"sniff","status":"detected","packet":"frame-{}"}}}}"#,
        n
    )
}

// =============================================================================
// Completed scans
// =============================================================================

#[tokio::test]
async fn test_results_kept_in_arrival_order() {
    let mut frames = vec![START.to_string()];
    frames.extend((0..5).map(sniff));
    frames.push(DONE.to_string());
    let h = Harness::new(ScriptedTransportFactory::with_frames(frames));

    let summary = h.controller.start(request()).unwrap().wait().await.unwrap();

    assert_eq!(summary.state, ScanState::Completed);
    let packets: Vec<_> = summary
        .results
        .iter()
        .map(|r| r.packet.clone().unwrap())
        .collect();
    assert_eq!(
        packets,
        vec!["frame-0", "frame-1", "frame-2", "frame-3", "frame-4"]
    );
    assert_eq!(summary.count_type("sniff"), 5);
}

#[tokio::test]
async fn test_sniff_inject_done_scenario() {
    let h = Harness::new(ScriptedTransportFactory::with_frames([
        START, SNIFF, INJECT, DONE,
    ]));
    let mut report_rx = h.controller.subscribe_report();

    let summary = h.controller.start(request()).unwrap().wait().await.unwrap();

    assert_eq!(summary.state, ScanState::Completed);
    assert_eq!(summary.results.len(), 2);
    assert_eq!(summary.counts_by_type.len(), 2);
    assert_eq!(summary.count_type("sniff"), 1);
    assert_eq!(summary.count_type("inject"), 1);
    assert_eq!(summary.count_status(ScanStatus::Success), 1);
    assert_eq!(summary.dropped_frames, 0);

    tokio::time::timeout(Duration::from_secs(2), report_rx.wait_for(|r| r.is_some()))
        .await
        .expect("report was never fetched")
        .unwrap();
    assert_eq!(h.controller.report().as_deref(), Some("# Report"));
    assert_eq!(h.reports.calls(), 1);

    assert_eq!(h.notifier.count(Severity::Success), 1);
    assert_eq!(h.notifier.count(Severity::Error), 0);
    assert_eq!(
        h.activity.messages(),
        vec![
            "WebSocket connected",
            "Live scan started on vcan0 (simulate=true)",
            "Result: sniff (detected)",
            "Result: inject (success)",
            "Live scan finished",
        ]
    );
    assert_eq!(h.activity.count(LogLevel::Success), 2);

    let stats = h.transports.stats();
    assert_eq!(stats.opened(), 1);
    assert_eq!(stats.open_now(), 0);
    assert_eq!(stats.close_calls(), 1);
    assert_eq!(h.controller.state(), ScanState::Idle);
}

#[tokio::test]
async fn test_malformed_frame_is_counted_and_skipped() {
    let h = Harness::new(ScriptedTransportFactory::with_frames([
        SNIFF,
        "{not json",
        INJECT,
    ]));
    let handle = h.controller.start(request()).unwrap();

    let ingested = wait_for(
        || {
            h.controller
                .snapshot()
                .map(|s| s.results.len() == 2)
                .unwrap_or(false)
        },
        Duration::from_secs(2),
    )
    .await;
    assert!(ingested);

    let snapshot = h.controller.snapshot().unwrap();
    assert_eq!(snapshot.state, ScanState::Streaming);
    assert_eq!(snapshot.dropped_frames, 1);
    assert!(h.notifier.is_empty());

    h.transports.push_frame(DONE);
    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.state, ScanState::Completed);
    assert_eq!(summary.results.len(), 2);
    assert_eq!(summary.dropped_frames, 1);
}

#[tokio::test]
async fn test_result_without_type_counts_as_unknown() {
    let h = Harness::new(ScriptedTransportFactory::with_frames([
        r#"{"event":"result","payload":{"status":"success"}}"#,
        DONE,
    ]));

    let summary = h.controller.start(request()).unwrap().wait().await.unwrap();

    assert_eq!(summary.state, ScanState::Completed);
    assert_eq!(summary.results.len(), 1);
    assert_eq!(summary.dropped_frames, 0);
    assert_eq!(summary.count_type("unknown"), 1);
    assert_eq!(summary.count_status(ScanStatus::Success), 1);
}

#[tokio::test]
async fn test_protocol_error_does_not_end_scan() {
    let h = Harness::new(ScriptedTransportFactory::with_frames([
        START,
        r#"{"event":"error","payload":{"error":"bus off"}}"#,
        r#"{"event":"error","payload":{}}"#,
        SNIFF,
        DONE,
    ]));

    let summary = h.controller.start(request()).unwrap().wait().await.unwrap();

    assert_eq!(summary.state, ScanState::Completed);
    assert_eq!(summary.results.len(), 1);
    assert_eq!(h.notifier.count(Severity::Error), 2);
    assert_eq!(h.notifier.count(Severity::Success), 1);

    let messages = h.activity.messages();
    assert!(messages.contains(&"Error: bus off".to_string()));
    assert!(messages.contains(&"Error: unknown".to_string()));
}

#[tokio::test]
async fn test_report_failure_is_ignored() {
    let h = Harness::with_reports(
        ScriptedTransportFactory::with_frames([START, DONE]),
        StaticReportService::unavailable(),
    );

    let summary = h.controller.start(request()).unwrap().wait().await.unwrap();
    assert_eq!(summary.state, ScanState::Completed);

    let reports = h.reports.clone();
    assert!(wait_for(|| reports.calls() == 1, Duration::from_secs(2)).await);
    assert_eq!(h.controller.report(), None);
    assert_eq!(h.notifier.count(Severity::Error), 0);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_connection_error_keeps_partial_results() {
    let h = Harness::new(
        ScriptedTransportFactory::with_frames([START, SNIFF, INJECT]).then(ScriptStep::Fail(
            TransportError::ReceiveFailed("connection reset".into()),
        )),
    );

    let summary = h.controller.start(request()).unwrap().wait().await.unwrap();

    assert_eq!(summary.state, ScanState::Failed);
    assert_eq!(summary.results.len(), 2);
    assert_eq!(h.notifier.count(Severity::Error), 1);
    assert_eq!(h.notifier.count(Severity::Success), 0);
    assert!(h
        .activity
        .messages()
        .contains(&"Connection error: Receive failed: connection reset".to_string()));
    assert_eq!(h.reports.calls(), 0);
    assert_eq!(h.transports.stats().close_calls(), 1);
}

#[tokio::test]
async fn test_open_failure_fails_scan() {
    let h = Harness::new(
        ScriptedTransportFactory::new()
            .fail_open(TransportError::Handshake("connection refused".into())),
    );

    let summary = h.controller.start(request()).unwrap().wait().await.unwrap();

    assert_eq!(summary.state, ScanState::Failed);
    assert!(summary.results.is_empty());
    assert_eq!(h.notifier.count(Severity::Error), 1);
    assert_eq!(h.transports.stats().opened(), 0);
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancel_is_silent_and_idempotent() {
    let h = Harness::new(ScriptedTransportFactory::with_frames([START, SNIFF]));
    let handle = h.controller.start(request()).unwrap();

    let streaming = wait_for(
        || h.controller.state() == ScanState::Streaming,
        Duration::from_secs(2),
    )
    .await;
    assert!(streaming);

    assert!(h.controller.cancel());
    assert!(!h.controller.cancel());

    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.state, ScanState::Cancelled);
    assert!(h.notifier.is_empty());
    assert!(!h.controller.cancel());

    let stats = h.transports.stats();
    assert_eq!(stats.close_calls(), 1);
    assert_eq!(stats.open_now(), 0);
}

#[tokio::test]
async fn test_frames_after_cancel_are_ignored() {
    let h = Harness::new(ScriptedTransportFactory::with_frames([START, SNIFF]));
    let handle = h.controller.start(request()).unwrap();

    let first = wait_for(
        || {
            h.controller
                .snapshot()
                .map(|s| s.results.len() == 1)
                .unwrap_or(false)
        },
        Duration::from_secs(2),
    )
    .await;
    assert!(first);

    // Queue more frames and cancel before the driver gets to run again
    h.transports.push_frame(INJECT);
    h.transports.push_frame(DONE);
    assert!(h.controller.cancel());

    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.state, ScanState::Cancelled);
    assert_eq!(summary.results.len(), 1);
    assert!(h.notifier.is_empty());
    assert_eq!(h.reports.calls(), 0);
}

#[tokio::test]
async fn test_cancel_while_connecting() {
    let h = Harness::new(ScriptedTransportFactory::new());
    let handle = h.controller.start(request()).unwrap();

    assert_eq!(h.controller.state(), ScanState::Connecting);
    assert!(h.controller.is_scanning());
    assert!(h.controller.cancel());

    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.state, ScanState::Cancelled);
    assert!(h.activity.entries().is_empty());
}

#[tokio::test]
async fn test_dropping_controller_cancels_scan() {
    let h = Harness::new(ScriptedTransportFactory::with_frames([START]));
    let handle = h.controller.start(request()).unwrap();
    let stats = h.transports.stats();
    let notifier = h.notifier.clone();

    drop(h);

    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.state, ScanState::Cancelled);
    assert!(notifier.is_empty());
    assert_eq!(stats.open_now(), 0);
}

// =============================================================================
// Start policy
// =============================================================================

#[tokio::test]
async fn test_second_start_is_rejected_while_live() {
    let h = Harness::new(ScriptedTransportFactory::with_frames([START]));
    let first = h.controller.start(request()).unwrap();

    let second = h.controller.start(request());
    match second {
        Err(ControllerError::ScanInProgress(id)) => assert_eq!(id, first.id()),
        other => panic!("expected ScanInProgress, got {:?}", other.map(|h| h.id())),
    }
    assert_eq!(h.transports.stats().created(), 1);

    h.controller.cancel();
    first.wait().await.unwrap();

    let third = h.controller.start(request()).unwrap();
    assert_eq!(h.transports.stats().created(), 2);
    h.controller.cancel();
    third.wait().await.unwrap();
}

#[tokio::test]
async fn test_controllers_are_independent() {
    let a = Harness::new(ScriptedTransportFactory::with_frames([START, SNIFF, DONE]));
    let b = Harness::new(ScriptedTransportFactory::with_frames([START]));

    let b_handle = b.controller.start(request()).unwrap();
    let summary = a.controller.start(request()).unwrap().wait().await.unwrap();

    assert_eq!(summary.state, ScanState::Completed);
    assert!(b.controller.is_scanning());

    b.controller.cancel();
    assert_eq!(b_handle.wait().await.unwrap().state, ScanState::Cancelled);
}

// =============================================================================
// Callbacks into the controller
// =============================================================================

/// Notifier and activity log that read the controller from inside every call
#[derive(Default)]
struct ControllerObserver {
    controller: OnceLock<Weak<ScanController>>,
    cancel_on_result: bool,
    seen: Mutex<Vec<(String, ScanState, bool)>>,
}

impl ControllerObserver {
    fn observe(&self, message: String) {
        let Some(controller) = self.controller.get().and_then(Weak::upgrade) else {
            return;
        };
        let state = controller.state();
        let scanning = controller.is_scanning();
        assert_eq!(controller.snapshot().map(|s| s.state), Some(state));

        if self.cancel_on_result && message.starts_with("Result:") {
            controller.cancel();
        }
        self.seen.lock().push((message, state, scanning));
    }

    fn seen(&self) -> Vec<(String, ScanState, bool)> {
        self.seen.lock().clone()
    }
}

impl NotificationSink for ControllerObserver {
    fn notify(&self, notification: Notification) {
        self.observe(notification.message);
    }
}

impl ActivityLog for ControllerObserver {
    fn append(&self, entry: LogEntry) {
        self.observe(entry.message);
    }
}

fn observed_controller(
    observer: &Arc<ControllerObserver>,
    transports: ScriptedTransportFactory,
) -> Arc<ScanController> {
    let controller = Arc::new(ScanController::new(
        Arc::new(transports),
        observer.clone(),
        observer.clone(),
        Arc::new(StaticReportService::new("# Report")),
    ));
    observer
        .controller
        .set(Arc::downgrade(&controller))
        .unwrap();
    controller
}

#[tokio::test]
async fn test_callbacks_can_read_controller_state() {
    let observer = Arc::new(ControllerObserver::default());
    let controller = observed_controller(
        &observer,
        ScriptedTransportFactory::with_frames([START, SNIFF, DONE]),
    );

    let handle = controller.start(request()).unwrap();
    let summary = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("driver blocked inside a callback")
        .unwrap();

    assert_eq!(summary.state, ScanState::Completed);
    let expected: Vec<(String, ScanState, bool)> = vec![
        ("WebSocket connected".into(), ScanState::Connecting, true),
        (
            "Live scan started on vcan0 (simulate=true)".into(),
            ScanState::Streaming,
            true,
        ),
        ("Result: sniff (detected)".into(), ScanState::Streaming, true),
        ("Live scan finished".into(), ScanState::Completed, false),
        ("Live scan finished".into(), ScanState::Completed, false),
    ];
    assert_eq!(observer.seen(), expected);
}

#[tokio::test]
async fn test_callback_can_cancel_scan() {
    let observer = Arc::new(ControllerObserver {
        cancel_on_result: true,
        ..Default::default()
    });
    let controller = observed_controller(
        &observer,
        ScriptedTransportFactory::with_frames([START, SNIFF, INJECT, DONE]),
    );

    let handle = controller.start(request()).unwrap();
    let summary = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("driver blocked inside a callback")
        .unwrap();

    assert_eq!(summary.state, ScanState::Cancelled);
    assert_eq!(summary.results.len(), 1);
    assert_eq!(observer.seen().len(), 3);
    assert!(!controller.is_scanning());
}
