//! Push transports for live scans
//!
//! Two interchangeable variants deliver the same frame contract:
//! - [`StreamSession`]: one-way Server-Sent Events push over HTTP
//! - [`SocketSession`]: bidirectional WebSocket
//!
//! A session yields raw frames until it is closed. A transport-level failure is
//! reported once as `Err`, after which the session is closed and yields `None`.
//!
//! # Example
//!
//! ```ignore
//! use canscan_client::transport::{HttpTransportFactory, TransportFactory};
//!
//! let factory = HttpTransportFactory::new(client);
//! let mut session = factory.create(TransportKind::Socket);
//! session.open(&request).await?;
//! while let Some(frame) = session.next_frame().await {
//!     println!("{}", frame?.data);
//! }
//! session.close().await;
//! ```

pub mod error;
mod socket;
mod stream;

pub use error::TransportError;
pub use socket::SocketSession;
pub use stream::{SseParser, StreamSession};

use async_trait::async_trait;
use canscan_core::{ScanRequest, TransportKind};

use crate::client::ScanClient;

/// Result type for transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// One undecoded unit of data delivered by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub data: String,
}

impl RawFrame {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

/// A single push-based connection to the scan backend
#[async_trait]
pub trait TransportSession: Send {
    /// Which variant this session is
    fn kind(&self) -> TransportKind;

    /// Connect and start receiving frames for the request
    async fn open(&mut self, request: &ScanRequest) -> TransportResult<()>;

    /// Wait for the next frame
    ///
    /// Returns `Some(Err(_))` exactly once on a transport failure, then `None`.
    /// Returns `None` once the session has been closed.
    async fn next_frame(&mut self) -> Option<TransportResult<RawFrame>>;

    /// Close the session. Redundant calls are no-ops.
    async fn close(&mut self);

    /// Whether the session has been closed, by either side
    fn is_closed(&self) -> bool;
}

/// Creates a fresh, unopened session for a transport kind
pub trait TransportFactory: Send + Sync {
    fn create(&self, kind: TransportKind) -> Box<dyn TransportSession>;
}

/// Factory for the real HTTP-based transports
#[derive(Debug, Clone)]
pub struct HttpTransportFactory {
    client: ScanClient,
}

impl HttpTransportFactory {
    pub fn new(client: ScanClient) -> Self {
        Self { client }
    }
}

impl TransportFactory for HttpTransportFactory {
    fn create(&self, kind: TransportKind) -> Box<dyn TransportSession> {
        match kind {
            TransportKind::Stream => Box::new(StreamSession::new(self.client.clone())),
            TransportKind::Socket => Box::new(SocketSession::new(self.client.clone())),
        }
    }
}
