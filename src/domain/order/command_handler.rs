use std::sync::Arc;
use uuid::Uuid;

use crate::event_sourcing::{Aggregate, EventEnvelope};

use super::aggregate::OrderAggregate;
use super::commands::OrderCommand;
use super::errors::{OrderCommandError, OrderError};
use super::repository::OrderStore;
use super::value_objects::OrderNumber;

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Command → Aggregate → Events → Order Store
//
// ============================================================================

/// Result of a handled command
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Aggregate state after the command
    pub order: OrderAggregate,
    /// Number of events the command produced (0 for an idempotent replay)
    pub events_applied: usize,
}

pub struct OrderCommandHandler {
    store: Arc<dyn OrderStore>,
}

impl OrderCommandHandler {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Handle a command and persist resulting events
    pub async fn handle(
        &self,
        order_number: &OrderNumber,
        command: OrderCommand,
        correlation_id: Uuid,
    ) -> Result<CommandOutcome, OrderCommandError> {
        match self.store.find(order_number).await? {
            Some(order) => self.execute(order, command, correlation_id).await,
            None => match command {
                OrderCommand::PlaceOrder { order_number, customer_email } => {
                    let events = OrderAggregate::place(order_number.clone(), customer_email.clone());
                    let first = events.first().ok_or(OrderError::NotInitialized)?;
                    let mut order = OrderAggregate::apply_first_event(first)?;
                    let events_applied = events.len();

                    let envelopes = events
                        .into_iter()
                        .enumerate()
                        .map(|(i, e)| {
                            EventEnvelope::new(order_number.as_str(), i as i64 + 1, e, correlation_id)
                        })
                        .collect();

                    order.version = self
                        .store
                        .upsert(&order_number, &customer_email, 0, envelopes)
                        .await?;

                    tracing::info!(
                        order_number = %order_number,
                        correlation_id = %correlation_id,
                        "Order placed"
                    );

                    Ok(CommandOutcome { order, events_applied })
                }
                _ => Err(OrderCommandError::NotFound(order_number.clone())),
            },
        }
    }

    /// Run a command against an already loaded aggregate.
    ///
    /// The aggregate's version is the expected version of the append, so a
    /// write that happened after loading surfaces as a store conflict.
    pub async fn execute(
        &self,
        mut order: OrderAggregate,
        command: OrderCommand,
        correlation_id: Uuid,
    ) -> Result<CommandOutcome, OrderCommandError> {
        let expected_version = order.version();

        let domain_events = order.handle_command(&command)?;
        if domain_events.is_empty() {
            return Ok(CommandOutcome { order, events_applied: 0 });
        }

        // Wrap in envelopes
        let mut envelopes = Vec::with_capacity(domain_events.len());
        let mut seq = expected_version;

        for domain_event in &domain_events {
            seq += 1;
            envelopes.push(EventEnvelope::new(
                order.aggregate_id(),
                seq,
                domain_event.clone(),
                correlation_id,
            ));
        }

        let new_version = self
            .store
            .upsert(&order.order_number, &order.customer_email, expected_version, envelopes)
            .await?;

        for event in &domain_events {
            order.apply_event(event)?;
        }
        order.set_version(new_version);

        Ok(CommandOutcome {
            order,
            events_applied: domain_events.len(),
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Email, EventSourcedOrderStore, OrderError, PhotoReference};
    use crate::event_sourcing::StoreError;

    fn handler() -> (OrderCommandHandler, Arc<EventSourcedOrderStore>) {
        let store = Arc::new(EventSourcedOrderStore::new());
        (OrderCommandHandler::new(store.clone()), store)
    }

    fn place(number: &str, email: &str) -> (OrderNumber, OrderCommand) {
        let order_number = OrderNumber::parse(number).unwrap();
        let command = OrderCommand::PlaceOrder {
            order_number: order_number.clone(),
            customer_email: Email::parse(email).unwrap(),
        };
        (order_number, command)
    }

    fn link(key: &str) -> OrderCommand {
        OrderCommand::LinkPhoto {
            photo: PhotoReference::new(format!("/photos/{}.jpg", key)),
            idempotency_key: key.to_string(),
            replace_existing: false,
        }
    }

    #[tokio::test]
    async fn test_place_then_link() {
        let (handler, store) = handler();
        let (number, command) = place("PET-1", "ana@teste.com");

        let placed = handler.handle(&number, command, Uuid::new_v4()).await.unwrap();
        assert_eq!(placed.order.version, 1);
        assert_eq!(placed.events_applied, 1);

        let linked = handler.handle(&number, link("k1"), Uuid::new_v4()).await.unwrap();
        assert_eq!(linked.order.version, 2);
        assert!(linked.order.is_ready());

        let stored = store.find(&number).await.unwrap().unwrap();
        assert!(stored.is_ready());
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_link_unknown_order_is_not_found() {
        let (handler, _) = handler();
        let number = OrderNumber::parse("PET-404").unwrap();

        let result = handler.handle(&number, link("k1"), Uuid::new_v4()).await;
        assert!(matches!(result, Err(OrderCommandError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_place_twice_is_rejected() {
        let (handler, _) = handler();
        let (number, command) = place("PET-1", "ana@teste.com");
        handler.handle(&number, command.clone(), Uuid::new_v4()).await.unwrap();

        let result = handler.handle(&number, command, Uuid::new_v4()).await;
        assert!(matches!(
            result,
            Err(OrderCommandError::Rejected(OrderError::AlreadyPlaced(_)))
        ));
    }

    #[tokio::test]
    async fn test_replay_appends_nothing() {
        let (handler, store) = handler();
        let (number, command) = place("PET-1", "ana@teste.com");
        handler.handle(&number, command, Uuid::new_v4()).await.unwrap();
        handler.handle(&number, link("k1"), Uuid::new_v4()).await.unwrap();

        let replay = handler.handle(&number, link("k1"), Uuid::new_v4()).await.unwrap();
        assert_eq!(replay.events_applied, 0);
        assert_eq!(store.find(&number).await.unwrap().unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_stale_aggregate_conflicts() {
        let (handler, store) = handler();
        let (number, command) = place("PET-1", "ana@teste.com");
        handler.handle(&number, command, Uuid::new_v4()).await.unwrap();

        let stale = store.find(&number).await.unwrap().unwrap();
        handler.handle(&number, link("k1"), Uuid::new_v4()).await.unwrap();

        let result = handler.execute(stale, link("k2"), Uuid::new_v4()).await;
        assert!(matches!(
            result,
            Err(OrderCommandError::Store(StoreError::Conflict { expected: 1, actual: 2, .. }))
        ));
    }
}
