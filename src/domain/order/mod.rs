// ============================================================================
// Order Domain - Business Logic for Order Aggregate
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (Email, OrderNumber, PhotoReference, OrderStatus)
// - Events (OrderPlaced, PhotoLinked)
// - Commands (PlaceOrder, LinkPhoto)
// - Errors (OrderError, OrderCommandError)
// - Aggregate (OrderAggregate with business logic)
// - Command Handler (OrderCommandHandler)
// - Repository (OrderStore port and its event-sourced implementation)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod command_handler;
pub mod repository;
pub mod fixtures;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use command_handler::*;
pub use repository::*;
