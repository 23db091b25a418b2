// Private module declaration
mod server;

use prometheus::{
    HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
};

use crate::utils::CircuitState;

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Order lookups by resulting status
// - Photo links by outcome
// - Request latency per operation
// - Retry attempts and outcomes on store reads
// - Photo storage circuit breaker state
// - Customer notifications relayed from the outbox
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    pub lookups_total: IntCounterVec,
    pub photo_links_total: IntCounterVec,
    pub request_duration: HistogramVec,

    pub retry_attempts_total: IntCounterVec,
    pub retry_success: IntCounterVec,
    pub retry_failure: IntCounterVec,

    pub circuit_breaker_state: IntGauge,

    pub notifications_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let lookups_total = IntCounterVec::new(
            Opts::new("order_lookups_total", "Order status lookups by result"),
            &["status"],
        )?;
        registry.register(Box::new(lookups_total.clone()))?;

        let photo_links_total = IntCounterVec::new(
            Opts::new("photo_links_total", "Photo link requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(photo_links_total.clone()))?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "Service call duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        let retry_attempts_total = IntCounterVec::new(
            Opts::new("retry_attempts_total", "Total retry attempts"),
            &["operation", "attempt"],
        )?;
        registry.register(Box::new(retry_attempts_total.clone()))?;

        let retry_success = IntCounterVec::new(
            Opts::new("retry_success_total", "Operations that succeeded after at least one retry"),
            &["operation"],
        )?;
        registry.register(Box::new(retry_success.clone()))?;

        let retry_failure = IntCounterVec::new(
            Opts::new("retry_failure_total", "Operations that failed after all attempts"),
            &["operation"],
        )?;
        registry.register(Box::new(retry_failure.clone()))?;

        let circuit_breaker_state = IntGauge::new(
            "circuit_breaker_state",
            "Photo storage circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        let notifications_total = IntCounterVec::new(
            Opts::new("customer_notifications_total", "Customer notifications relayed from the outbox"),
            &["result"],
        )?;
        registry.register(Box::new(notifications_total.clone()))?;

        Ok(Self {
            registry,
            lookups_total,
            photo_links_total,
            request_duration,
            retry_attempts_total,
            retry_success,
            retry_failure,
            circuit_breaker_state,
            notifications_total,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_lookup(&self, status: &str, duration_secs: f64) {
        self.lookups_total.with_label_values(&[status]).inc();
        self.request_duration.with_label_values(&["lookup"]).observe(duration_secs);
    }

    pub fn record_photo_link(&self, outcome: &str, duration_secs: f64) {
        self.photo_links_total.with_label_values(&[outcome]).inc();
        self.request_duration.with_label_values(&["link_photo"]).observe(duration_secs);
    }

    pub fn record_retry_attempt(&self, operation: &str, attempt: u32) {
        self.retry_attempts_total.with_label_values(&[operation, &attempt.to_string()]).inc();
    }

    pub fn record_retry_outcome(&self, operation: &str, success: bool) {
        if success {
            self.retry_success.with_label_values(&[operation]).inc();
        } else {
            self.retry_failure.with_label_values(&[operation]).inc();
        }
    }

    pub fn update_circuit_breaker_state(&self, state: CircuitState) {
        self.circuit_breaker_state.set(state.as_gauge());
    }

    pub fn record_notification(&self, delivered: bool) {
        let result = if delivered { "delivered" } else { "failed" };
        self.notifications_total.with_label_values(&[result]).inc();
    }
}
