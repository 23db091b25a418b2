use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::event_sourcing::DomainEvent;
use super::value_objects::{Email, OrderNumber, PhotoReference};

// ============================================================================
// Order Events - Domain Events for Order Aggregate
// ============================================================================

/// Order Event - Union type for all order events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    Placed(OrderPlaced),
    PhotoLinked(PhotoLinked),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Placed(_) => "OrderPlaced",
            OrderEvent::PhotoLinked(_) => "PhotoLinked",
        }
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Order Placed - created by the fulfillment system, starts in production
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderPlaced {
    pub order_number: OrderNumber,
    pub customer_email: Email,
    pub placed_at: DateTime<Utc>,
}

/// Photo Linked - staff attached the finished-product photo, order is ready
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PhotoLinked {
    pub photo: PhotoReference,
    /// Previous photo when an explicit replacement was requested
    pub replaced: Option<PhotoReference>,
    pub idempotency_key: String,
    pub linked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names() {
        let placed = OrderEvent::Placed(OrderPlaced {
            order_number: OrderNumber::parse("PET-1").unwrap(),
            customer_email: Email::parse("ana@teste.com").unwrap(),
            placed_at: Utc::now(),
        });
        assert_eq!(placed.event_type(), "OrderPlaced");

        let linked = OrderEvent::PhotoLinked(PhotoLinked {
            photo: PhotoReference::new("/photos/PET-1/a.jpg"),
            replaced: None,
            idempotency_key: "k".to_string(),
            linked_at: Utc::now(),
        });
        assert_eq!(linked.event_type(), "PhotoLinked");
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = OrderEvent::PhotoLinked(PhotoLinked {
            photo: PhotoReference::new("/photos/PET-1/a.jpg"),
            replaced: None,
            idempotency_key: "k".to_string(),
            linked_at: Utc::now(),
        });

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PhotoLinked");
        assert_eq!(json["data"]["photo"], "/photos/PET-1/a.jpg");
    }
}
