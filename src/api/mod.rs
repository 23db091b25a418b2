// ============================================================================
// HTTP API
// ============================================================================
//
// Public routes:
//   POST /api/orders/search   customer status lookup (JSON)
//   GET  /                    status page, search form
//   GET  /status?email=       status page for one customer
//   GET  /photos/{order}/{f}  stored product photos
//   GET  /health              liveness + photo storage breaker state
//
// Staff routes (unauthenticated):
//   POST /api/admin/photos    raw image body, links it to an order
//   POST /api/admin/orders    register an order from fulfillment
//
// ============================================================================

pub mod dto;
pub mod handlers;
pub mod presenter;
pub mod server;

pub use server::{configure, start_api_server, AppState};
