//! Socket transport - bidirectional WebSocket
//!
//! Opening performs the WebSocket handshake before any frame flows. Closing
//! sends a Close frame so the backend can stop the scan.

use async_trait::async_trait;
use canscan_core::{ScanRequest, TransportKind};
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use super::{RawFrame, TransportError, TransportResult, TransportSession};
use crate::client::ScanClient;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Live scan session over a WebSocket
pub struct SocketSession {
    client: ScanClient,
    socket: Option<WsStream>,
    closed: bool,
}

impl SocketSession {
    pub fn new(client: ScanClient) -> Self {
        Self {
            client,
            socket: None,
            closed: false,
        }
    }

    fn sever(&mut self) {
        self.closed = true;
        self.socket = None;
    }
}

#[async_trait]
impl TransportSession for SocketSession {
    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    async fn open(&mut self, request: &ScanRequest) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::ConnectionClosed);
        }

        let request = ScanRequest {
            transport: TransportKind::Socket,
            ..request.clone()
        };
        let url = self
            .client
            .live_scan_url(&request)
            .map_err(|e| TransportError::InvalidEndpoint(e.to_string()))?;

        debug!("Opening WebSocket: {}", url);

        let (socket, response) = connect_async(url.as_str()).await.map_err(|e| {
            self.closed = true;
            TransportError::Handshake(e.to_string())
        })?;
        debug!(status = %response.status(), "WebSocket handshake complete");

        self.socket = Some(socket);
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<TransportResult<RawFrame>> {
        loop {
            if self.closed {
                return None;
            }

            let Some(socket) = self.socket.as_mut() else {
                self.closed = true;
                return Some(Err(TransportError::NotOpen));
            };

            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Some(Ok(RawFrame::new(text.as_str())));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Some(Ok(RawFrame::new(String::from_utf8_lossy(&data))));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "WebSocket closed by peer");
                    self.sever();
                    return Some(Err(TransportError::ConnectionClosed));
                }
                Some(Ok(other)) => {
                    trace!(?other, "Ignoring WebSocket control message");
                }
                Some(Err(e)) => {
                    self.sever();
                    return Some(Err(TransportError::ReceiveFailed(e.to_string())));
                }
                None => {
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
        self.closed = true;

        if let Some(mut socket) = self.socket.take() {
            debug!("Sending WebSocket close");
            if let Err(e) = socket.close(None).await {
                debug!("WebSocket close failed: {}", e);
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
