//! Durable append-and-query log of chat events.

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

use async_trait::async_trait;
use ripple_wire::ChatEvent;

use crate::error::StoreError;

/// The message store and history service.
///
/// `history` returns at most `limit` rows for `channel`, always in ascending
/// timestamp order: implementations select newest-first and reverse before
/// returning. Rows are append-only; nothing here updates or deletes.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, event: &ChatEvent) -> Result<(), StoreError>;
    async fn history(&self, channel: &str, limit: i64) -> Result<Vec<ChatEvent>, StoreError>;
}
