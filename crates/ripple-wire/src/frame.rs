use serde::{Deserialize, Deserializer, Serialize};

use crate::event::ChatEvent;

/// Channel used when a frame names none.
pub const DEFAULT_CHANNEL: &str = "#general";

/// History rows returned when the request carries no usable limit.
pub const DEFAULT_HISTORY_LIMIT: i64 = 200;

/// Hard cap on history rows per request.
pub const MAX_HISTORY_LIMIT: i64 = 500;

/// Inbound `say`: post a message to a channel.
///
/// Every field is optional; the relay fills in defaults. The relay dispatches
/// on the `type` tag before deserializing, so these are standalone structs
/// rather than one serde enum: an unknown tag has to fall through to a
/// diagnostic echo, not a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SayFrame {
    pub channel: Option<String>,
    pub text: Option<String>,
    pub ts: Option<i64>,
    pub from: Option<String>,
    pub resolution: Option<String>,
    pub uuid: Option<String>,
}

/// Inbound `history`: request a bounded replay for one channel.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryFrame {
    pub channel: Option<String>,
    #[serde(default, deserialize_with = "lenient_limit")]
    pub limit: Option<f64>,
}

/// Inbound `ping`: latency probe. The requester computes the round trip from
/// the echoed `ts`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PingFrame {
    pub ts: Option<i64>,
}

/// Frames the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    /// A live post, fanned out to every connection including the sender.
    Msg {
        channel: String,
        from: String,
        text: String,
        ts: i64,
        #[serde(rename = "fromIp")]
        from_ip: String,
    },
    /// Replay result, chronological order, sent to the requester only.
    History { channel: String, items: Vec<ChatEvent> },
    /// Latency probe reply; `ts` is the request's value, untouched.
    Pong {
        #[serde(skip_serializing_if = "Option::is_none")]
        ts: Option<i64>,
    },
    /// Welcome notices and diagnostics. With `ip` set this is a
    /// connection-identity notice, not a displayable chat line.
    Sys {
        text: String,
        ts: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        ip: Option<String>,
    },
}

/// Accept any JSON value for `limit`; only numbers survive. A string or
/// object limit is treated as absent rather than failing the whole frame.
fn lenient_limit<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}

/// Clamp a requested history limit to `[1, MAX_HISTORY_LIMIT]`; absent or
/// non-finite requests fall back to `DEFAULT_HISTORY_LIMIT`.
pub fn clamp_history_limit(requested: Option<f64>) -> i64 {
    match requested {
        Some(n) if n.is_finite() => (n as i64).clamp(1, MAX_HISTORY_LIMIT),
        _ => DEFAULT_HISTORY_LIMIT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp_history_limit(Some(0.0)), 1);
        assert_eq!(clamp_history_limit(Some(-3.0)), 1);
        assert_eq!(clamp_history_limit(Some(10_000.0)), MAX_HISTORY_LIMIT);
        assert_eq!(clamp_history_limit(Some(50.0)), 50);
        assert_eq!(clamp_history_limit(Some(50.9)), 50);
        assert_eq!(clamp_history_limit(None), DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn non_numeric_limit_is_absent() {
        let frame: HistoryFrame =
            serde_json::from_str(r##"{"channel":"#a","limit":"lots"}"##).unwrap();
        assert_eq!(frame.limit, None);
        assert_eq!(clamp_history_limit(frame.limit), DEFAULT_HISTORY_LIMIT);

        let frame: HistoryFrame = serde_json::from_str(r#"{"limit":{}}"#).unwrap();
        assert_eq!(frame.limit, None);
    }

    #[test]
    fn numeric_limit_parses() {
        let frame: HistoryFrame = serde_json::from_str(r#"{"limit":42}"#).unwrap();
        assert_eq!(frame.limit, Some(42.0));
        let frame: HistoryFrame = serde_json::from_str(r#"{"limit":42.5}"#).unwrap();
        assert_eq!(frame.limit, Some(42.5));
    }

    #[test]
    fn say_fields_all_optional() {
        let frame: SayFrame = serde_json::from_str(r#"{"type":"say"}"#).unwrap();
        assert!(frame.channel.is_none());
        assert!(frame.text.is_none());
        assert!(frame.ts.is_none());

        let frame: SayFrame = serde_json::from_str(
            r##"{"type":"say","channel":"#general","text":"hi","ts":1000,"from":"alice","resolution":"800x600","uuid":"u-1","extra":true}"##,
        )
        .unwrap();
        assert_eq!(frame.channel.as_deref(), Some("#general"));
        assert_eq!(frame.ts, Some(1000));
        assert_eq!(frame.uuid.as_deref(), Some("u-1"));
    }

    #[test]
    fn msg_frame_wire_shape() {
        let frame = ServerFrame::Msg {
            channel: "#general".into(),
            from: "alice".into(),
            text: "hi".into(),
            ts: 1000,
            from_ip: "10.0.0.7".into(),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "msg");
        assert_eq!(json["fromIp"], "10.0.0.7");
        assert_eq!(json["ts"], 1000);
    }

    #[test]
    fn pong_omits_absent_ts() {
        let json = serde_json::to_value(ServerFrame::Pong { ts: None }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "pong"}));

        let json = serde_json::to_value(ServerFrame::Pong { ts: Some(7) }).unwrap();
        assert_eq!(json["ts"], 7);
    }

    #[test]
    fn sys_omits_absent_ip() {
        let frame = ServerFrame::Sys {
            text: "history unavailable".into(),
            ts: 1000,
            ip: None,
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert!(json.get("ip").is_none());

        let frame = ServerFrame::Sys {
            text: "connected from 10.0.0.7".into(),
            ts: 1000,
            ip: Some("10.0.0.7".into()),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["ip"], "10.0.0.7");
    }
}
