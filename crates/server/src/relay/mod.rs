//! Protocol dispatch: one inbound frame in, one explicitly-targeted reply
//! out.
//!
//! The relay is stateless per message. Each frame kind has its own handler;
//! the handler's result says where the outbound frame goes instead of the
//! handler sending anything itself.

use std::sync::Arc;

use chrono::Utc;
use ripple_wire::{
    clamp_history_limit, ChatEvent, HistoryFrame, PingFrame, SayFrame, ServerFrame,
    DEFAULT_CHANNEL,
};
use serde_json::Value;
use tracing::{error, warn};

use crate::store::MessageStore;

/// Where a dispatched frame goes: back to the submitting connection only, or
/// to every registered connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Reply(ServerFrame),
    Broadcast(ServerFrame),
}

pub struct Relay {
    store: Arc<dyn MessageStore>,
}

impl Relay {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Handle one raw inbound text frame from the connection at `addr`.
    ///
    /// Never fails: every malformed input turns into a sender-only
    /// diagnostic, and the connection stays open.
    pub async fn handle_frame(&self, addr: &str, raw: &str) -> Dispatch {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => return Dispatch::Reply(sys(format!("invalid frame: {}", e))),
        };

        match value.get("type").and_then(Value::as_str) {
            Some("say") => self.handle_say(addr, value).await,
            Some("history") => self.handle_history(value).await,
            Some("ping") => handle_ping(value),
            _ => Dispatch::Reply(sys(format!("unhandled frame: {}", value))),
        }
    }

    /// Post: persist, then fan out to everyone including the sender.
    ///
    /// A failed write is logged and the broadcast still goes out; the
    /// message stays live but will be missing from future replays. Chosen
    /// trade-off, availability over durability.
    async fn handle_say(&self, addr: &str, value: Value) -> Dispatch {
        let say: SayFrame = match serde_json::from_value(value) {
            Ok(say) => say,
            Err(e) => return Dispatch::Reply(sys(format!("invalid frame: {}", e))),
        };

        let channel = say.channel.unwrap_or_else(|| DEFAULT_CHANNEL.to_string());
        let text = say.text.unwrap_or_default();
        // Echoed back so the origin can correlate its optimistic local copy.
        let ts = say.ts.unwrap_or_else(now_millis);

        let event = ChatEvent {
            channel: channel.clone(),
            sender_ip: addr.to_string(),
            text: text.clone(),
            ts,
            sender_name: say.from.clone(),
            client_meta: say.resolution,
            client_uuid: say.uuid,
        };

        if let Err(e) = self.store.append(&event).await {
            warn!("persist failed for {} ({}), continuing with live delivery", channel, e);
        }

        Dispatch::Broadcast(ServerFrame::Msg {
            channel,
            from: say.from.unwrap_or_else(|| "echo".to_string()),
            text,
            ts,
            from_ip: addr.to_string(),
        })
    }

    /// Bounded replay for one channel, requester only.
    async fn handle_history(&self, value: Value) -> Dispatch {
        let request: HistoryFrame = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => return Dispatch::Reply(sys(format!("invalid frame: {}", e))),
        };

        let channel = request.channel.unwrap_or_else(|| DEFAULT_CHANNEL.to_string());
        let limit = clamp_history_limit(request.limit);

        match self.store.history(&channel, limit).await {
            Ok(items) => Dispatch::Reply(ServerFrame::History { channel, items }),
            Err(e) => {
                error!("history query failed for {}: {}", channel, e);
                Dispatch::Reply(sys("history unavailable".to_string()))
            }
        }
    }
}

/// Latency probe: echo the request timestamp untouched; the requester
/// computes the round-trip delta.
fn handle_ping(value: Value) -> Dispatch {
    let ping: PingFrame = serde_json::from_value(value).unwrap_or_default();
    Dispatch::Reply(ServerFrame::Pong { ts: ping.ts })
}

/// Welcome notice carrying the resolved origin address. Clients treat a
/// `sys` with an `ip` field as a connection-identity notice, not a chat
/// line.
pub fn welcome_frame(addr: &str) -> ServerFrame {
    ServerFrame::Sys {
        text: format!("connected from {}", addr),
        ts: now_millis(),
        ip: Some(addr.to_string()),
    }
}

fn sys(text: String) -> ServerFrame {
    ServerFrame::Sys {
        text,
        ts: now_millis(),
        ip: None,
    }
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
