//! canscan-mockd - Mock CAN scan backend
//!
//! Serves the HTTP surface a live scan client talks to: the SSE and WebSocket
//! live scan endpoints, the report and an in-memory results store. Used by
//! integration tests and for local demos without a CAN bus.
//!
//! # Usage
//!
//! ```ignore
//! use canscan_mockd::{create_router, MockConfig, MockState};
//!
//! let state = MockState::new(MockConfig::default().with_frame_delay(Duration::ZERO));
//! let router = create_router(state);
//! ```

pub mod error;
pub mod handlers;
pub mod scenario;
pub mod state;

pub use error::MockError;
pub use state::{MockConfig, MockState, DEFAULT_FRAME_DELAY};

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the mock backend router with the given state
pub fn create_router(state: MockState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::results::health))
        // Report
        .route("/api/report", get(handlers::results::get_report))
        // Results store
        .route(
            "/api/results",
            get(handlers::results::list_results).delete(handlers::results::clear_results),
        )
        // Live scans
        .route("/api/scan/stream", get(handlers::scan::stream_scan))
        .route("/api/scan/ws", get(handlers::scan::socket_scan))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use canscan_core::{ScanResult, ScanStatus};
    use tower::ServiceExt;

    fn quiet_state() -> MockState {
        MockState::new(MockConfig::default().with_frame_delay(Duration::ZERO))
    }

    async fn send(router: Router, method: &str, uri: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(create_router(quiet_state()), "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_stream_records_results() {
        let state = quiet_state();
        let (status, body) = send(
            create_router(state.clone()),
            "GET",
            "/api/scan/stream?interface=vcan0&simulate=1",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.matches("\"event\":\"result\"").count(), 3);
        assert!(body.contains("\"event\":\"done\""));
        assert_eq!(state.results().len(), 3);
    }

    #[tokio::test]
    async fn test_stream_rejects_empty_interface() {
        let (status, body) = send(
            create_router(quiet_state()),
            "GET",
            "/api/scan/stream?interface=&simulate=1",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("interface must not be empty"));
    }

    #[tokio::test]
    async fn test_results_list_and_clear() {
        let state = quiet_state();
        state.record(&ScanResult::new("sniff", ScanStatus::Detected));

        let (_, body) = send(create_router(state.clone()), "GET", "/api/results").await;
        let list: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(list["results"][0]["type"], "sniff");

        let (status, body) = send(create_router(state.clone()), "DELETE", "/api/results").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"cleared":1}"#);
        assert!(state.results().is_empty());
    }

    #[tokio::test]
    async fn test_report_offline() {
        let state = MockState::new(MockConfig::default().with_report_offline());
        let (status, body) = send(create_router(state), "GET", "/api/report").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("service_unavailable"));
    }
}
