//! MySQL-backed message store.
//!
//! Schema provisioning is a one-time external step; see `schema.sql` at the
//! repository root.

use async_trait::async_trait;
use ripple_wire::ChatEvent;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use tracing::info;

use crate::config::ServerConfig;
use crate::error::StoreError;
use crate::store::MessageStore;

type EventRow = (
    String,
    String,
    String,
    i64,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// Message store on a bounded MySQL connection pool.
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Build a lazily-connected pool from config.
    ///
    /// Lazy so a database that is down at boot degrades to per-operation
    /// store errors instead of failing the process; acquires queue when all
    /// pool connections are busy.
    pub fn connect(config: &ServerConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.db_host)
            .port(config.db_port)
            .username(&config.db_user)
            .password(&config.db_pass)
            .database(&config.db_name);

        let pool = MySqlPoolOptions::new()
            .max_connections(config.db_pool_size)
            .connect_lazy_with(options);

        info!(
            "message store: mysql {}@{}:{}/{} (pool {})",
            config.db_user, config.db_host, config.db_port, config.db_name, config.db_pool_size
        );

        Self { pool }
    }
}

#[async_trait]
impl MessageStore for MySqlStore {
    async fn append(&self, event: &ChatEvent) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO messages (channel, sender_ip, text, ts, sender_name, client_meta, client_uuid) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.channel)
        .bind(&event.sender_ip)
        .bind(&event.text)
        .bind(event.ts)
        .bind(&event.sender_name)
        .bind(&event.client_meta)
        .bind(&event.client_uuid)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Write)?;

        Ok(())
    }

    async fn history(&self, channel: &str, limit: i64) -> Result<Vec<ChatEvent>, StoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT channel, sender_ip, text, ts, sender_name, client_meta, client_uuid \
             FROM messages WHERE channel = ? ORDER BY ts DESC LIMIT ?",
        )
        .bind(channel)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Query)?;

        let mut events: Vec<ChatEvent> = rows
            .into_iter()
            .map(
                |(channel, sender_ip, text, ts, sender_name, client_meta, client_uuid)| ChatEvent {
                    channel,
                    sender_ip,
                    text,
                    ts,
                    sender_name,
                    client_meta,
                    client_uuid,
                },
            )
            .collect();

        // Newest-first from the index, chronological for the consumer.
        events.reverse();
        Ok(events)
    }
}
