//! In-memory message store.
//!
//! Same ordering contract as the MySQL store, no durability. Backs unit and
//! integration tests through the `MessageStore` trait.

use async_trait::async_trait;
use parking_lot::Mutex;
use ripple_wire::ChatEvent;

use crate::error::StoreError;
use crate::store::MessageStore;

#[derive(Default)]
pub struct MemoryStore {
    events: Mutex<Vec<ChatEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Snapshot of everything stored, in append order.
    pub fn events(&self) -> Vec<ChatEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(&self, event: &ChatEvent) -> Result<(), StoreError> {
        self.events.lock().push(event.clone());
        Ok(())
    }

    async fn history(&self, channel: &str, limit: i64) -> Result<Vec<ChatEvent>, StoreError> {
        let mut matching: Vec<ChatEvent> = self
            .events
            .lock()
            .iter()
            .filter(|e| e.channel == channel)
            .cloned()
            .collect();

        // Newest-first cut, then reverse, mirroring the MySQL query.
        matching.sort_by(|a, b| b.ts.cmp(&a.ts));
        matching.truncate(limit.max(0) as usize);
        matching.reverse();
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn event(channel: &str, ts: i64, text: &str) -> ChatEvent {
        ChatEvent {
            channel: channel.into(),
            sender_ip: "127.0.0.1".into(),
            text: text.into(),
            ts,
            sender_name: None,
            client_meta: None,
            client_uuid: None,
        }
    }

    #[tokio::test]
    async fn history_is_chronological_and_capped() {
        let store = MemoryStore::new();
        // Append out of timestamp order on purpose.
        for ts in [30, 10, 50, 20, 40] {
            assert_ok!(store.append(&event("#a", ts, "x")).await);
        }
        assert_ok!(store.append(&event("#b", 99, "other channel")).await);

        let items = store.history("#a", 3).await.unwrap();
        let stamps: Vec<i64> = items.iter().map(|e| e.ts).collect();
        // Newest three, ascending.
        assert_eq!(stamps, vec![30, 40, 50]);
    }

    #[tokio::test]
    async fn history_of_unknown_channel_is_empty() {
        let store = MemoryStore::new();
        assert_ok!(store.append(&event("#a", 1, "x")).await);
        let items = store.history("#nope", 50).await.unwrap();
        assert!(items.is_empty());
    }
}
