use std::collections::HashMap;
use std::marker::PhantomData;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::event_sourcing::core::{Aggregate, DomainEvent, EmptyHistory, EventEnvelope, serialize_event};
use super::errors::StoreError;

// ============================================================================
// Generic Event Store - Repository for Events
// ============================================================================
//
// This is a GENERIC event store that works with ANY event type.
//
// Type Parameter:
// - `E`: The domain event type (must implement DomainEvent trait)
//
// Responsibilities:
// 1. Append events to per-aggregate streams (append-only)
// 2. Load event history for aggregates
// 3. Ensure optimistic concurrency control
// 4. Write to outbox for publishing
//
// Streams and outbox share one lock, so an append and its outbox entries
// become visible together or not at all.
//
// ============================================================================

/// Message waiting in the transactional outbox
#[derive(Debug, Clone)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub event_id: Uuid,
    pub event_type: String,
    pub payload: String,
    pub topic: String,
    pub correlation_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub attempts: u32,
    pub delivered_at: Option<DateTime<Utc>>,
}

struct StoreState<E> {
    streams: HashMap<String, Vec<EventEnvelope<E>>>,
    outbox: Vec<OutboxMessage>,
}

pub struct EventStore<E: DomainEvent> {
    state: RwLock<StoreState<E>>,
    aggregate_type_name: String,  // e.g., "Order"
    topic_name: String,            // e.g., "order-events"
    _phantom: PhantomData<E>,
}

impl<E: DomainEvent> EventStore<E> {
    pub fn new(aggregate_type_name: &str, topic_name: &str) -> Self {
        Self {
            state: RwLock::new(StoreState {
                streams: HashMap::new(),
                outbox: Vec::new(),
            }),
            aggregate_type_name: aggregate_type_name.to_string(),
            topic_name: topic_name.to_string(),
            _phantom: PhantomData,
        }
    }

    /// Append events to the event store
    /// Returns the new version number after appending
    pub async fn append_events(
        &self,
        aggregate_id: &str,
        expected_version: i64,
        events: Vec<EventEnvelope<E>>,
        publish_to_outbox: bool,
    ) -> Result<i64, StoreError> {
        if events.is_empty() {
            return Err(StoreError::EmptyAppend);
        }

        // Serialize outside the lock
        let mut payloads = Vec::with_capacity(events.len());
        if publish_to_outbox {
            for envelope in &events {
                payloads.push(serialize_event(&envelope.event_data)?);
            }
        }

        let mut state = self.state.write().await;

        // Check optimistic concurrency
        let current_version = stream_version(&state.streams, aggregate_id);

        if current_version != expected_version {
            tracing::warn!(
                aggregate_id = %aggregate_id,
                expected_version,
                current_version,
                "Rejected append: concurrency conflict"
            );
            return Err(StoreError::Conflict {
                aggregate_id: aggregate_id.to_string(),
                expected: expected_version,
                actual: current_version,
            });
        }

        let event_count = events.len();
        let mut new_version = expected_version;
        let mut sequenced = Vec::with_capacity(event_count);
        let mut outbox_entries = Vec::with_capacity(payloads.len());

        for (index, mut envelope) in events.into_iter().enumerate() {
            new_version += 1;
            envelope.sequence_number = new_version;
            envelope.aggregate_id = aggregate_id.to_string();

            if let Some(payload) = payloads.get(index) {
                outbox_entries.push(OutboxMessage {
                    id: Uuid::new_v4(),
                    aggregate_id: aggregate_id.to_string(),
                    aggregate_type: self.aggregate_type_name.clone(),
                    event_id: envelope.event_id,
                    event_type: envelope.event_type.clone(),
                    payload: payload.clone(),
                    topic: self.topic_name.clone(),
                    correlation_id: envelope.correlation_id,
                    created_at: Utc::now(),
                    attempts: 0,
                    delivered_at: None,
                });
            }

            sequenced.push(envelope);
        }

        state
            .streams
            .entry(aggregate_id.to_string())
            .or_default()
            .extend(sequenced);
        state.outbox.extend(outbox_entries);

        tracing::info!(
            aggregate_id = %aggregate_id,
            aggregate_type = %self.aggregate_type_name,
            new_version = new_version,
            event_count = event_count,
            "Appended events to event store"
        );

        Ok(new_version)
    }

    /// Load all events for an aggregate, in sequence order
    pub async fn load_events(&self, aggregate_id: &str) -> Vec<EventEnvelope<E>> {
        let state = self.state.read().await;
        let events = state.streams.get(aggregate_id).cloned().unwrap_or_default();

        tracing::debug!("Loaded {} events for aggregate {}", events.len(), aggregate_id);
        events
    }

    /// Load aggregate from events, `None` when the stream is empty
    pub async fn load_aggregate<A>(&self, aggregate_id: &str) -> Result<Option<A>, StoreError>
    where
        A: Aggregate<Event = E>,
        A::Error: From<EmptyHistory> + std::fmt::Display,
    {
        let events = self.load_events(aggregate_id).await;

        if events.is_empty() {
            return Ok(None);
        }

        A::load_from_events(&events)
            .map(Some)
            .map_err(|e| StoreError::Corrupted(format!("{}: {}", aggregate_id, e)))
    }

    /// Undelivered outbox messages, oldest first
    pub async fn pending_outbox(&self, limit: usize) -> Vec<OutboxMessage> {
        let state = self.state.read().await;
        let mut pending: Vec<OutboxMessage> = state
            .outbox
            .iter()
            .filter(|m| m.delivered_at.is_none())
            .cloned()
            .collect();

        pending.sort_by_key(|m| m.created_at);
        pending.truncate(limit);
        pending
    }

    /// Record a delivery attempt. Returns false when the message was already delivered.
    pub async fn mark_outbox_delivered(&self, id: Uuid, delivered: bool) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let message = state
            .outbox
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::UnknownOutboxMessage(id))?;

        if message.delivered_at.is_some() {
            return Ok(false);
        }

        message.attempts += 1;
        if delivered {
            message.delivered_at = Some(Utc::now());
        }

        Ok(true)
    }
}

/// Sequence number of the last event in a stream (0 when it does not exist)
fn stream_version<E>(streams: &HashMap<String, Vec<EventEnvelope<E>>>, aggregate_id: &str) -> i64 {
    streams
        .get(aggregate_id)
        .and_then(|stream| stream.last())
        .map_or(0, |last| last.sequence_number)
}

// ============================================================================
// Unit Tests
// ============================================================================
