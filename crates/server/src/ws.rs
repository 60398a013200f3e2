//! WebSocket connection lifecycle.
//!
//! One reader task per connection (this function) and one writer task
//! draining the connection's outbound queue. Store I/O happens on the read
//! path only, so a slow query never stalls broadcasts to other connections.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::IntoResponse,
};
use bytes::Bytes;
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::registry::ConnectionHandle;
use crate::relay::{self, Dispatch};
use crate::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let addr = resolve_origin(&headers, peer);
    ws.on_upgrade(move |socket| handle_socket(socket, state, addr))
}

/// Resolve the client's origin address once, at accept time: first
/// `x-forwarded-for` entry, then `x-real-ip`, then the transport peer. The
/// result is immutable for the connection and recorded as `fromIp` on every
/// post; it is never taken from the payload.
pub fn resolve_origin(headers: &HeaderMap, peer: SocketAddr) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real = real.trim();
        if !real.is_empty() {
            return real.to_string();
        }
    }

    peer.ip().to_string()
}

async fn handle_socket(socket: WebSocket, state: AppState, addr: String) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let id = Uuid::new_v4();

    state
        .registry
        .register(ConnectionHandle::new(id, addr.clone(), tx));
    info!(
        "connection {} open from {} ({} online)",
        id,
        addr,
        state.registry.len()
    );

    // Writer: the single point of egress for this connection. Draining one
    // queue is what keeps delivery FIFO per connection; the ticker keeps
    // idle connections alive through intermediaries.
    let keepalive = Duration::from_secs(state.config.keepalive_secs);
    let writer = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(keepalive);
        ticker.tick().await; // skip the immediate first tick

        loop {
            tokio::select! {
                frame = rx.recv() => match frame {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Queued after registration, so it rides the same FIFO as broadcasts.
    state.registry.send_to(&id, &relay::welcome_frame(&addr));

    while let Some(message) = ws_rx.next().await {
        match message {
            Ok(Message::Text(text)) => {
                match state.relay.handle_frame(&addr, text.as_str()).await {
                    Dispatch::Reply(frame) => state.registry.send_to(&id, &frame),
                    Dispatch::Broadcast(frame) => state.registry.broadcast(&frame),
                }
            }
            Ok(Message::Close(_)) => break,
            // Binary frames are not part of the protocol; control frames are
            // answered by axum itself.
            Ok(_) => {}
            Err(e) => {
                debug!("socket error from {}: {}", addr, e);
                break;
            }
        }
    }

    state.registry.unregister(&id);
    writer.abort();
    info!(
        "connection {} closed ({} online)",
        id,
        state.registry.len()
    );
}
