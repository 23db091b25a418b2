use crate::event_sourcing::{EmptyHistory, StoreError};
use super::value_objects::OrderNumber;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Email cannot be empty")]
    EmptyEmail,

    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Order number cannot be empty")]
    EmptyOrderNumber,

    #[error("Invalid order number: {0}")]
    InvalidOrderNumber(String),

    #[error("Idempotency key cannot be empty")]
    EmptyIdempotencyKey,

    #[error("Order {0} already exists")]
    AlreadyPlaced(OrderNumber),

    #[error("Order {0} is already ready and has a photo")]
    AlreadyReady(OrderNumber),

    #[error("Aggregate not initialized")]
    NotInitialized,

    #[error(transparent)]
    EmptyHistory(#[from] EmptyHistory),
}

// ============================================================================
// Command Handling Errors
// ============================================================================

/// Failure of a command: either a business rule or the store refused it
#[derive(Debug, thiserror::Error)]
pub enum OrderCommandError {
    #[error("Order not found: {0}")]
    NotFound(OrderNumber),

    #[error(transparent)]
    Rejected(#[from] OrderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
