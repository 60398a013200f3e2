use thiserror::Error;

/// Message store failures.
///
/// Writes and queries recover differently: a failed write is logged and the
/// live broadcast still goes out, a failed query turns into a diagnostic
/// notice to the requester. Neither closes the connection.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to persist chat event: {0}")]
    Write(#[source] sqlx::Error),
    #[error("failed to query chat history: {0}")]
    Query(#[source] sqlx::Error),
}
