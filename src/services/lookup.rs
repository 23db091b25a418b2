use std::sync::Arc;
use std::time::Instant;
use serde::Serialize;

use crate::config::ServiceSettings;
use crate::domain::order::{Email, OrderAggregate, OrderNumber, OrderStore, PhotoReference};
use crate::metrics::Metrics;
use super::errors::ServiceError;
use super::store_reads::read_with_retry;

// ============================================================================
// Order Lookup - "where is my mug?"
// ============================================================================

/// What a customer sees for their email. Exactly one variant applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum OrderResult {
    NotFound,
    InProduction {
        order_number: OrderNumber,
    },
    Ready {
        order_number: OrderNumber,
        photo_reference: PhotoReference,
    },
}

impl OrderResult {
    pub fn from_order(order: &OrderAggregate) -> Self {
        match &order.photo {
            Some(photo) if order.is_ready() => OrderResult::Ready {
                order_number: order.order_number.clone(),
                photo_reference: photo.clone(),
            },
            _ => OrderResult::InProduction {
                order_number: order.order_number.clone(),
            },
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self {
            OrderResult::NotFound => "not-found",
            OrderResult::InProduction { .. } => "in-production",
            OrderResult::Ready { .. } => "ready",
        }
    }
}

pub struct OrderLookupService {
    store: Arc<dyn OrderStore>,
    settings: ServiceSettings,
    metrics: Option<Arc<Metrics>>,
}

impl OrderLookupService {
    pub fn new(store: Arc<dyn OrderStore>, settings: ServiceSettings) -> Self {
        Self {
            store,
            settings,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Status of the most recently placed order for `customer_email`.
    ///
    /// An unknown email is `OrderResult::NotFound`, not an error. Errors are
    /// malformed input (`Validation`) or a store that stayed unavailable
    /// through every retry or past the request timeout (`Transient`).
    pub async fn lookup(&self, customer_email: &str) -> Result<OrderResult, ServiceError> {
        let started = Instant::now();
        let result = self.lookup_inner(customer_email).await;

        let label = match &result {
            Ok(found) => found.status_label(),
            Err(e) => e.kind(),
        };
        tracing::debug!(status = label, elapsed_ms = started.elapsed().as_millis() as u64, "Order lookup");
        if let Some(metrics) = &self.metrics {
            metrics.record_lookup(label, started.elapsed().as_secs_f64());
        }

        result
    }

    async fn lookup_inner(&self, customer_email: &str) -> Result<OrderResult, ServiceError> {
        let email = Email::parse(customer_email)?;

        match tokio::time::timeout(self.settings.request_timeout, self.latest_for(&email)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.settings.request_timeout.as_millis() as u64,
                    "Order lookup timed out"
                );
                Err(ServiceError::Transient("order lookup timed out".to_string()))
            }
        }
    }

    async fn latest_for(&self, email: &Email) -> Result<OrderResult, ServiceError> {
        if !self.settings.simulated_latency.is_zero() {
            tokio::time::sleep(self.settings.simulated_latency).await;
        }

        let store = self.store.as_ref();
        let orders = read_with_retry(
            "order_store_get",
            &self.settings.read_retry,
            self.metrics.as_deref(),
            move || store.get(email),
        )
        .await?;

        // Store returns most recently placed first
        Ok(orders
            .first()
            .map(OrderResult::from_order)
            .unwrap_or(OrderResult::NotFound))
    }
}
