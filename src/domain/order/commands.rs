use super::value_objects::{Email, OrderNumber, PhotoReference};

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

#[derive(Debug, Clone)]
pub enum OrderCommand {
    PlaceOrder {
        order_number: OrderNumber,
        customer_email: Email,
    },
    LinkPhoto {
        photo: PhotoReference,
        idempotency_key: String,
        /// Allow overwriting the photo of an order that is already ready
        replace_existing: bool,
    },
}
