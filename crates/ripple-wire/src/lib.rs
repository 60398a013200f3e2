//! Wire protocol for the ripple chat relay.
//!
//! JSON text frames over a persistent duplex connection, tagged by `type`.
//! Inbound kinds: `say`, `history`, `ping`. Outbound kinds: `msg`,
//! `history`, `pong`, `sys`.

pub mod event;
pub mod frame;

pub use event::ChatEvent;
pub use frame::{
    clamp_history_limit, HistoryFrame, PingFrame, SayFrame, ServerFrame, DEFAULT_CHANNEL,
    DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT,
};
