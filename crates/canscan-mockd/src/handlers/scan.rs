//! Live scan handlers
//!
//! Both endpoints play the same frame sequence; only the transport differs.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use canscan_core::TransportKind;
use tracing::{debug, info};

use crate::error::Result;
use crate::scenario::{plan, PlannedFrame, ScanQuery};
use crate::state::MockState;

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// GET /api/scan/stream
pub async fn stream_scan(
    State(state): State<MockState>,
    Query(query): Query<ScanQuery>,
) -> Result<Response> {
    let interface = query.interface()?;
    let simulate = query.simulate();
    info!(%interface, simulate, "Live scan over event stream");

    let frames = plan(&state, &interface, simulate, TransportKind::Stream);
    let delay = state.config().frame_delay;

    let stream = async_stream::stream! {
        for frame in frames {
            frame.commit(&state);
            yield Ok::<_, Infallible>(Event::default().data(frame.data));
            pause(delay).await;
        }
        debug!("Event stream finished");
    };

    Ok(Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response())
}

/// GET /api/scan/ws
pub async fn socket_scan(
    ws: WebSocketUpgrade,
    State(state): State<MockState>,
    Query(query): Query<ScanQuery>,
) -> Result<Response> {
    let interface = query.interface()?;
    let simulate = query.simulate();
    info!(%interface, simulate, "Live scan over WebSocket");

    let frames = plan(&state, &interface, simulate, TransportKind::Socket);
    Ok(ws.on_upgrade(move |socket| play_socket(socket, state, frames)))
}

async fn play_socket(mut socket: WebSocket, state: MockState, frames: Vec<PlannedFrame>) {
    let delay = state.config().frame_delay;

    for frame in frames {
        frame.commit(&state);
        if socket.send(Message::Text(frame.data.into())).await.is_err() {
            debug!("Client went away mid-scan");
            return;
        }
        pause(delay).await;
    }

    let _ = socket.send(Message::Close(None)).await;
    debug!("WebSocket scan finished");
}
