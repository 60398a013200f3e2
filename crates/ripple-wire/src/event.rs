use serde::{Deserialize, Serialize};

/// A single chat event: the persisted row and the item shape inside a
/// `history` reply.
///
/// `sender_ip` is the address the server resolved at accept time, never a
/// client-supplied value. `ts` is milliseconds since epoch. `client_uuid`
/// passes through losslessly so consumers can deduplicate resubmissions
/// across reconnects; the relay itself never dedupes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub channel: String,
    #[serde(rename = "ip")]
    pub sender_ip: String,
    pub text: String,
    pub ts: i64,
    #[serde(rename = "from", skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(rename = "resolution", skip_serializing_if = "Option::is_none")]
    pub client_meta: Option<String>,
    #[serde(rename = "uuid", skip_serializing_if = "Option::is_none")]
    pub client_uuid: Option<String>,
}
