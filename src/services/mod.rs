// ============================================================================
// Application Services
// ============================================================================
//
// - OrderLookupService: customer-facing status lookup by email
// - PhotoLinkService: staff attach the finished-product photo to an order
// - OrderRegistrationService: orders arriving from the fulfillment system
// - PhotoStorage: where uploaded photos are kept
//
// ============================================================================

pub mod errors;
pub mod lookup;
pub mod photo_link;
pub mod photo_storage;
pub mod registration;
mod store_reads;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{ServiceError, ValidationError};
pub use lookup::{OrderLookupService, OrderResult};
pub use photo_link::{LinkResult, PhotoLinkRequest, PhotoLinkService, LINK_SUCCESS_MESSAGE};
pub use photo_storage::{InMemoryPhotoStorage, PhotoStorage, PhotoUpload, StorageError, StoredPhoto};
pub use registration::OrderRegistrationService;
