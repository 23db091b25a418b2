use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::NotificationSettings;
use crate::domain::order::{Email, OrderEvent, OrderNumber, OrderStore, PhotoReference};
use crate::event_sourcing::{deserialize_event, OutboxMessage, StoreError};
use crate::metrics::Metrics;

// ============================================================================
// Notification Relay - polls the order outbox and tells customers
// ============================================================================
//
// Every PhotoLinked append writes an outbox entry in the same atomic step.
// The relay:
// 1. Fetches pending outbox entries, oldest first
// 2. Resolves the customer of each PhotoLinked order
// 3. Hands the notification to a sink (log line by default)
// 4. Marks the entry delivered, so a second pass never notifies twice
//
// Entries that keep failing are given up after MAX_DELIVERY_ATTEMPTS.
//
// ============================================================================

const MAX_DELIVERY_ATTEMPTS: u32 = 5;

pub const READY_SUBJECT: &str = "Sua Looneca ficou pronta!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerNotification {
    pub customer_email: Email,
    pub order_number: OrderNumber,
    pub photo: PhotoReference,
    pub subject: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification channel unavailable: {0}")]
    Unavailable(String),
}

/// Delivery channel for customer notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &CustomerNotification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of sending e-mail
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn deliver(&self, notification: &CustomerNotification) -> Result<(), NotifyError> {
        tracing::info!(
            customer_email = %notification.customer_email,
            order_number = %notification.order_number,
            photo = %notification.photo,
            subject = %notification.subject,
            "📧 Customer notified"
        );
        Ok(())
    }
}

pub struct NotificationRelay {
    store: Arc<dyn OrderStore>,
    sink: Arc<dyn NotificationSink>,
    settings: NotificationSettings,
    metrics: Option<Arc<Metrics>>,
}

impl NotificationRelay {
    pub fn new(store: Arc<dyn OrderStore>, sink: Arc<dyn NotificationSink>, settings: NotificationSettings) -> Self {
        Self {
            store,
            sink,
            settings,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Start the polling loop on the runtime
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                poll_interval_ms = self.settings.poll_interval.as_millis() as u64,
                "🔄 Starting notification relay"
            );

            let mut ticker = tokio::time::interval(self.settings.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match self.run_once().await {
                    Ok(0) => {}
                    Ok(count) => tracing::debug!(count, "Relayed outbox batch"),
                    Err(e) => {
                        tracing::warn!(error = %e, "Outbox poll failed, retrying next tick");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        })
    }

    /// Process one batch of pending outbox entries.
    ///
    /// Returns how many entries were settled (delivered, skipped or given up).
    pub async fn run_once(&self) -> Result<usize, StoreError> {
        let pending = self.store.pending_notifications(self.settings.batch_size).await?;
        let mut settled = 0;

        for message in pending {
            if self.relay(&message).await? {
                settled += 1;
            }
        }

        Ok(settled)
    }

    async fn relay(&self, message: &OutboxMessage) -> Result<bool, StoreError> {
        let event: OrderEvent = match deserialize_event(&message.payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(
                    outbox_id = %message.id,
                    event_type = %message.event_type,
                    error = %e,
                    "Unreadable outbox payload, dropping"
                );
                self.record(false);
                return self.store.mark_notified(message.id, true).await;
            }
        };

        let linked = match event {
            OrderEvent::PhotoLinked(linked) => linked,
            OrderEvent::Placed(_) => {
                tracing::debug!(outbox_id = %message.id, "Nothing to notify for order placement");
                return self.store.mark_notified(message.id, true).await;
            }
        };

        let notification = match self.notification_for(message, linked.photo).await? {
            Some(notification) => notification,
            None => {
                tracing::error!(
                    outbox_id = %message.id,
                    aggregate_id = %message.aggregate_id,
                    "Outbox entry references an unknown order, dropping"
                );
                self.record(false);
                return self.store.mark_notified(message.id, true).await;
            }
        };

        match self.sink.deliver(&notification).await {
            Ok(()) => {
                tracing::debug!(
                    outbox_id = %message.id,
                    event_id = %message.event_id,
                    aggregate_type = %message.aggregate_type,
                    topic = %message.topic,
                    correlation_id = %message.correlation_id,
                    "Outbox entry delivered"
                );
                self.record(true);
                self.store.mark_notified(message.id, true).await
            }
            Err(e) => {
                self.record(false);
                let give_up = message.attempts + 1 >= MAX_DELIVERY_ATTEMPTS;
                if give_up {
                    tracing::error!(
                        outbox_id = %message.id,
                        order_number = %notification.order_number,
                        attempts = message.attempts + 1,
                        error = %e,
                        "Giving up on customer notification"
                    );
                } else {
                    tracing::warn!(
                        outbox_id = %message.id,
                        order_number = %notification.order_number,
                        attempt = message.attempts + 1,
                        error = %e,
                        "Customer notification failed, will retry"
                    );
                }
                self.store.mark_notified(message.id, give_up).await?;
                Ok(give_up)
            }
        }
    }

    async fn notification_for(
        &self,
        message: &OutboxMessage,
        photo: PhotoReference,
    ) -> Result<Option<CustomerNotification>, StoreError> {
        let Ok(order_number) = OrderNumber::parse(&message.aggregate_id) else {
            return Ok(None);
        };

        Ok(self.store.find(&order_number).await?.map(|order| CustomerNotification {
            customer_email: order.customer_email,
            order_number: order.order_number,
            photo,
            subject: READY_SUBJECT.to_string(),
        }))
    }

    fn record(&self, delivered: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_notification(delivered);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
