use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use uuid::Uuid;

use crate::config::ServiceSettings;
use crate::domain::order::{
    fixtures, Email, EventSourcedOrderStore, OrderAggregate, OrderCommandHandler, OrderEvent,
    OrderNumber, OrderStore, PhotoReference,
};
use crate::event_sourcing::{EventEnvelope, OutboxMessage, StoreError};
use crate::utils::RetryConfig;

/// Store with the demo orders already placed
pub async fn seeded_store() -> Arc<EventSourcedOrderStore> {
    let store = Arc::new(EventSourcedOrderStore::new());
    let handler = OrderCommandHandler::new(store.clone());
    fixtures::seed(&handler, PhotoReference::new(fixtures::READY_PHOTO)).await.unwrap();
    store
}

/// Settings with short backoff so retry tests stay fast
pub fn fast_settings() -> ServiceSettings {
    ServiceSettings {
        read_retry: RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        },
        ..ServiceSettings::default()
    }
}

/// Wraps a store and fails the first `failures` reads with `Unavailable`
pub struct FlakyStore {
    inner: Arc<dyn OrderStore>,
    failures_left: AtomicU32,
    reads: AtomicU32,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn OrderStore>, failures: u32) -> Self {
        Self {
            inner,
            failures_left: AtomicU32::new(failures),
            reads: AtomicU32::new(0),
        }
    }

    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    fn trip(&self) -> Result<(), StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            Err(StoreError::Unavailable("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl OrderStore for FlakyStore {
    async fn get(&self, email: &Email) -> Result<Vec<OrderAggregate>, StoreError> {
        self.trip()?;
        self.inner.get(email).await
    }

    async fn find(&self, order_number: &OrderNumber) -> Result<Option<OrderAggregate>, StoreError> {
        self.trip()?;
        self.inner.find(order_number).await
    }

    async fn upsert(
        &self,
        order_number: &OrderNumber,
        customer_email: &Email,
        expected_version: i64,
        events: Vec<EventEnvelope<OrderEvent>>,
    ) -> Result<i64, StoreError> {
        self.inner.upsert(order_number, customer_email, expected_version, events).await
    }

    async fn pending_notifications(&self, limit: usize) -> Result<Vec<OutboxMessage>, StoreError> {
        self.inner.pending_notifications(limit).await
    }

    async fn mark_notified(&self, id: Uuid, delivered: bool) -> Result<bool, StoreError> {
        self.inner.mark_notified(id, delivered).await
    }
}
