//! Stream transport - one-way Server-Sent Events push
//!
//! There is no open acknowledgment beyond the HTTP status, and the server
//! cannot be told to stop: closing only drops the response body.

mod parser;

pub use parser::SseParser;

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use canscan_core::{ScanRequest, TransportKind};
use futures::stream::{Stream, StreamExt};
use tracing::debug;

use super::{RawFrame, TransportError, TransportResult, TransportSession};
use crate::client::ScanClient;

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Live scan session over Server-Sent Events
pub struct StreamSession {
    client: ScanClient,
    body: Option<ByteStream>,
    parser: SseParser,
    pending: VecDeque<RawFrame>,
    closed: bool,
}

impl StreamSession {
    pub fn new(client: ScanClient) -> Self {
        Self {
            client,
            body: None,
            parser: SseParser::new(),
            pending: VecDeque::new(),
            closed: false,
        }
    }

    /// Drop the connection after a transport failure
    fn sever(&mut self) {
        self.closed = true;
        self.body = None;
        self.pending.clear();
    }
}

#[async_trait]
impl TransportSession for StreamSession {
    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }

    async fn open(&mut self, request: &ScanRequest) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::ConnectionClosed);
        }

        let request = ScanRequest {
            transport: TransportKind::Stream,
            ..request.clone()
        };
        let url = self
            .client
            .live_scan_url(&request)
            .map_err(|e| TransportError::InvalidEndpoint(e.to_string()))?;

        debug!("Connecting to SSE stream: {}", url);

        let response = self
            .client
            .streaming_client()
            .get(url)
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            self.sever();
            return Err(TransportError::Server { status, message });
        }

        self.body = Some(Box::pin(response.bytes_stream()));
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<TransportResult<RawFrame>> {
        loop {
            if self.closed {
                return None;
            }

            if let Some(frame) = self.pending.pop_front() {
                return Some(Ok(frame));
            }

            let Some(body) = self.body.as_mut() else {
                self.closed = true;
                return Some(Err(TransportError::NotOpen));
            };

            match body.next().await {
                Some(Ok(bytes)) => {
                    self.pending.extend(self.parser.feed(&bytes));
                }
                Some(Err(e)) => {
                    self.sever();
                    return Some(Err(TransportError::ReceiveFailed(e.to_string())));
                }
                None => {
                    debug!("SSE stream ended by server");
                    self.sever();
                    return Some(Err(TransportError::ConnectionClosed));
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        debug!("Closing SSE stream");
        self.sever();
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
