//! CAN scan client library
//!
//! Talks to a CAN security scan backend: a typed REST client for results and
//! reports, two push transports for live scans and the [`ScanController`] that
//! drives a live scan from connect to final report.
//!
//! # Example
//!
//! ```rust,no_run
//! use canscan_client::ScanClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ScanClient::new("http://localhost:8000")?;
//!
//!     // Stored results from earlier scans
//!     for row in client.list_results().await? {
//!         println!("{} {} {}", row.id, row.kind, row.status);
//!     }
//!
//!     // Latest report text
//!     println!("{}", client.get_report().await?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module provides scripted transports and recording
//! collaborators for controller tests, plus a [`testing::TestServer`] for
//! running against a real router:
//!
//! ```rust,ignore
//! use canscan_client::testing::TestServer;
//! use canscan_mockd::{create_router, MockState};
//!
//! let server = TestServer::start(create_router(MockState::default())).await?;
//! let results = server.client.list_results().await?;
//! ```

pub mod aggregator;
mod client;
pub mod controller;
pub mod decoder;
mod error;
pub mod testing;
pub mod transport;

pub use aggregator::ResultAggregator;
pub use client::{live_scan_url, ScanClient, SOCKET_PATH, STREAM_PATH};
pub use controller::{ScanController, ScanHandle, ScanState, ScanSummary};
pub use decoder::{EventDecoder, ScanEvent};
pub use error::{ControllerError, Result, ScanClientError};

// Re-export core types for convenience
pub use canscan_core::{ScanRequest, ScanResult, ScanStatus, TransportKind};
