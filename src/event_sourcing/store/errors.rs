use uuid::Uuid;

use crate::utils::IsTransient;

// ============================================================================
// Storage Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Concurrency conflict on {aggregate_id}: expected version {expected}, but current is {actual}")]
    Conflict {
        aggregate_id: String,
        expected: i64,
        actual: i64,
    },

    #[error("Cannot append empty event list")]
    EmptyAppend,

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Stored history is corrupted: {0}")]
    Corrupted(String),

    #[error("Unknown outbox message: {0}")]
    UnknownOutboxMessage(Uuid),

    #[error("Event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IsTransient for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
