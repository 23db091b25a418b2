use std::collections::HashMap;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::event_sourcing::{EventEnvelope, EventStore, OutboxMessage, StoreError};
use super::aggregate::OrderAggregate;
use super::events::OrderEvent;
use super::value_objects::{Email, OrderNumber};

// ============================================================================
// Order Store - the persistence port for orders
// ============================================================================
//
// Services depend on this trait only, so the in-memory implementation can
// be swapped for a database-backed one (or a failing one in tests).
//
// ============================================================================

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// All orders placed with this email, most recently placed first
    async fn get(&self, email: &Email) -> Result<Vec<OrderAggregate>, StoreError>;

    async fn find(&self, order_number: &OrderNumber) -> Result<Option<OrderAggregate>, StoreError>;

    /// Append events for one order. Fails with `StoreError::Conflict` when
    /// the order moved past `expected_version`.
    async fn upsert(
        &self,
        order_number: &OrderNumber,
        customer_email: &Email,
        expected_version: i64,
        events: Vec<EventEnvelope<OrderEvent>>,
    ) -> Result<i64, StoreError>;

    async fn pending_notifications(&self, limit: usize) -> Result<Vec<OutboxMessage>, StoreError>;

    async fn mark_notified(&self, id: Uuid, delivered: bool) -> Result<bool, StoreError>;
}

// ============================================================================
// Event-sourced implementation
// ============================================================================

pub struct EventSourcedOrderStore {
    events: EventStore<OrderEvent>,
    by_email: RwLock<HashMap<Email, Vec<OrderNumber>>>,
}

impl EventSourcedOrderStore {
    pub fn new() -> Self {
        Self {
            events: EventStore::new("Order", "order-events"),
            by_email: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for EventSourcedOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for EventSourcedOrderStore {
    async fn get(&self, email: &Email) -> Result<Vec<OrderAggregate>, StoreError> {
        let numbers = {
            let index = self.by_email.read().await;
            index.get(email).cloned().unwrap_or_default()
        };

        let mut orders = Vec::with_capacity(numbers.len());
        for number in &numbers {
            if let Some(order) = self.events.load_aggregate::<OrderAggregate>(number.as_str()).await? {
                orders.push(order);
            }
        }

        orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));
        Ok(orders)
    }

    async fn find(&self, order_number: &OrderNumber) -> Result<Option<OrderAggregate>, StoreError> {
        self.events.load_aggregate::<OrderAggregate>(order_number.as_str()).await
    }

    async fn upsert(
        &self,
        order_number: &OrderNumber,
        customer_email: &Email,
        expected_version: i64,
        events: Vec<EventEnvelope<OrderEvent>>,
    ) -> Result<i64, StoreError> {
        if expected_version != 0 {
            return self
                .events
                .append_events(order_number.as_str(), expected_version, events, true)
                .await;
        }

        // A placement holds the index lock across the append, so `get` never
        // misses an order that `find` already returns
        let mut index = self.by_email.write().await;
        let new_version = self
            .events
            .append_events(order_number.as_str(), expected_version, events, true)
            .await?;

        let numbers = index.entry(customer_email.clone()).or_default();
        if !numbers.contains(order_number) {
            numbers.push(order_number.clone());
        }

        Ok(new_version)
    }

    async fn pending_notifications(&self, limit: usize) -> Result<Vec<OutboxMessage>, StoreError> {
        Ok(self.events.pending_outbox(limit).await)
    }

    async fn mark_notified(&self, id: Uuid, delivered: bool) -> Result<bool, StoreError> {
        self.events.mark_outbox_delivered(id, delivered).await
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
