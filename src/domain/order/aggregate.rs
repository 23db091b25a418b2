use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::event_sourcing::Aggregate;
use super::value_objects::{Email, OrderNumber, OrderStatus, PhotoReference};
use super::events::*;
use super::commands::OrderCommand;
use super::errors::OrderError;

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================
//
// Lifecycle: Placed (InProduction) -> PhotoLinked (Ready). Never goes back.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAggregate {
    // Identity
    pub order_number: OrderNumber,
    pub version: i64,

    // Current State (derived from events)
    pub customer_email: Email,
    pub status: OrderStatus,
    pub photo: Option<PhotoReference>,

    // Audit Trail
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Idempotency keys of every applied photo link
    pub applied_links: Vec<String>,
}

impl OrderAggregate {
    /// Events that create a new order
    pub fn place(order_number: OrderNumber, customer_email: Email) -> Vec<OrderEvent> {
        vec![OrderEvent::Placed(OrderPlaced {
            order_number,
            customer_email,
            placed_at: Utc::now(),
        })]
    }

    pub fn is_ready(&self) -> bool {
        self.status == OrderStatus::Ready
    }

    pub fn has_applied(&self, idempotency_key: &str) -> bool {
        self.applied_links.iter().any(|key| key == idempotency_key)
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for OrderAggregate {
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            OrderEvent::Placed(e) => Ok(Self {
                order_number: e.order_number.clone(),
                version: 0,
                customer_email: e.customer_email.clone(),
                status: OrderStatus::InProduction,
                photo: None,
                placed_at: e.placed_at,
                updated_at: e.placed_at,
                applied_links: Vec::new(),
            }),
            _ => Err(OrderError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            OrderEvent::Placed(_) => {
                // First event already applied
                Ok(())
            }
            OrderEvent::PhotoLinked(e) => {
                self.status = OrderStatus::Ready;
                self.photo = Some(e.photo.clone());
                self.updated_at = e.linked_at;
                self.applied_links.push(e.idempotency_key.clone());
                Ok(())
            }
        }
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder { .. } => {
                Err(OrderError::AlreadyPlaced(self.order_number.clone()))
            }

            OrderCommand::LinkPhoto { photo, idempotency_key, replace_existing } => {
                if idempotency_key.trim().is_empty() {
                    return Err(OrderError::EmptyIdempotencyKey);
                }

                // Same request seen before: nothing to do
                if self.has_applied(idempotency_key) {
                    return Ok(vec![]);
                }

                let replaced = match self.status {
                    OrderStatus::InProduction => None,
                    OrderStatus::Ready if *replace_existing => self.photo.clone(),
                    OrderStatus::Ready => {
                        return Err(OrderError::AlreadyReady(self.order_number.clone()))
                    }
                };

                Ok(vec![OrderEvent::PhotoLinked(PhotoLinked {
                    photo: photo.clone(),
                    replaced,
                    idempotency_key: idempotency_key.clone(),
                    linked_at: Utc::now(),
                })])
            }
        }
    }

    fn aggregate_id(&self) -> &str {
        self.order_number.as_str()
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::EventEnvelope;
    use uuid::Uuid;

    fn placed_order() -> OrderAggregate {
        let events = OrderAggregate::place(
            OrderNumber::parse("PET-2025-001").unwrap(),
            Email::parse("producao@teste.com").unwrap(),
        );
        OrderAggregate::apply_first_event(&events[0]).unwrap()
    }

    fn link(photo: &str, key: &str, replace_existing: bool) -> OrderCommand {
        OrderCommand::LinkPhoto {
            photo: PhotoReference::new(photo),
            idempotency_key: key.to_string(),
            replace_existing,
        }
    }

    #[test]
    fn test_placed_order_is_in_production() {
        let order = placed_order();
        assert_eq!(order.status, OrderStatus::InProduction);
        assert!(order.photo.is_none());
        assert_eq!(order.aggregate_id(), "PET-2025-001");
    }

    #[test]
    fn test_link_photo_emits_event() {
        let order = placed_order();
        let events = order.handle_command(&link("/photos/a.jpg", "k1", false)).unwrap();

        assert_eq!(events.len(), 1);
        match &events[0] {
            OrderEvent::PhotoLinked(e) => {
                assert_eq!(e.photo.as_str(), "/photos/a.jpg");
                assert!(e.replaced.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_photo_linked_makes_order_ready() {
        let mut order = placed_order();
        let events = order.handle_command(&link("/photos/a.jpg", "k1", false)).unwrap();
        order.apply_event(&events[0]).unwrap();

        assert!(order.is_ready());
        assert_eq!(order.photo, Some(PhotoReference::new("/photos/a.jpg")));
        assert!(order.has_applied("k1"));
    }

    #[test]
    fn test_ready_order_rejects_second_photo() {
        let mut order = placed_order();
        let events = order.handle_command(&link("/photos/a.jpg", "k1", false)).unwrap();
        order.apply_event(&events[0]).unwrap();

        let result = order.handle_command(&link("/photos/b.jpg", "k2", false));
        assert!(matches!(result, Err(OrderError::AlreadyReady(_))));
    }

    #[test]
    fn test_explicit_replacement_records_previous_photo() {
        let mut order = placed_order();
        let events = order.handle_command(&link("/photos/a.jpg", "k1", false)).unwrap();
        order.apply_event(&events[0]).unwrap();

        let events = order.handle_command(&link("/photos/b.jpg", "k2", true)).unwrap();
        match &events[0] {
            OrderEvent::PhotoLinked(e) => {
                assert_eq!(e.replaced, Some(PhotoReference::new("/photos/a.jpg")));
            }
            other => panic!("unexpected event: {:?}", other),
        }

        order.apply_event(&events[0]).unwrap();
        assert_eq!(order.photo, Some(PhotoReference::new("/photos/b.jpg")));
        assert_eq!(order.status, OrderStatus::Ready);
    }

    #[test]
    fn test_repeated_idempotency_key_emits_nothing() {
        let mut order = placed_order();
        let events = order.handle_command(&link("/photos/a.jpg", "k1", false)).unwrap();
        order.apply_event(&events[0]).unwrap();

        let events = order.handle_command(&link("/photos/other.jpg", "k1", false)).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_blank_idempotency_key_rejected() {
        let order = placed_order();
        let result = order.handle_command(&link("/photos/a.jpg", "  ", false));
        assert!(matches!(result, Err(OrderError::EmptyIdempotencyKey)));
    }

    #[test]
    fn test_place_on_existing_order_rejected() {
        let order = placed_order();
        let result = order.handle_command(&OrderCommand::PlaceOrder {
            order_number: order.order_number.clone(),
            customer_email: order.customer_email.clone(),
        });
        assert!(matches!(result, Err(OrderError::AlreadyPlaced(_))));
    }

    #[test]
    fn test_apply_first_event_requires_placed() {
        let event = OrderEvent::PhotoLinked(PhotoLinked {
            photo: PhotoReference::new("/photos/a.jpg"),
            replaced: None,
            idempotency_key: "k".to_string(),
            linked_at: Utc::now(),
        });

        let result = OrderAggregate::apply_first_event(&event);
        assert!(matches!(result, Err(OrderError::NotInitialized)));
    }

    #[test]
    fn test_load_from_events_full_lifecycle() {
        let correlation_id = Uuid::new_v4();
        let mut events: Vec<EventEnvelope<OrderEvent>> = OrderAggregate::place(
            OrderNumber::parse("PET-2025-001").unwrap(),
            Email::parse("producao@teste.com").unwrap(),
        )
        .into_iter()
        .map(|e| EventEnvelope::new("PET-2025-001", 1, e, correlation_id))
        .collect();

        events.push(EventEnvelope::new(
            "PET-2025-001",
            2,
            OrderEvent::PhotoLinked(PhotoLinked {
                photo: PhotoReference::new("/photos/a.jpg"),
                replaced: None,
                idempotency_key: "k1".to_string(),
                linked_at: Utc::now(),
            }),
            correlation_id,
        ));

        let order = OrderAggregate::load_from_events(&events).unwrap();
        assert_eq!(order.version, 2);
        assert!(order.is_ready());
    }

    #[test]
    fn test_load_from_empty_history_fails() {
        let result = OrderAggregate::load_from_events(&[]);
        assert!(matches!(result, Err(OrderError::EmptyHistory(_))));
    }
}
