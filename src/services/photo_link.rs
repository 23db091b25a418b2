use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::ServiceSettings;
use crate::domain::order::{
    Email, OrderAggregate, OrderCommand, OrderCommandError, OrderCommandHandler, OrderError, OrderNumber,
    OrderStore, PhotoReference,
};
use crate::event_sourcing::StoreError;
use crate::metrics::Metrics;
use crate::utils::{CircuitBreaker, CircuitBreakerError, CircuitState};
use super::errors::{ServiceError, ValidationError};
use super::photo_storage::{PhotoStorage, PhotoUpload};
use super::store_reads::read_with_retry;

// ============================================================================
// Photo Link - staff attach the finished-product photo to an order
// ============================================================================
//
// Flow: validate → resolve order → replay check → Ready policy →
//       upload photo (circuit breaker) → append PhotoLinked (CAS on version)
//
// A failed append removes the uploaded photo again. The append itself is
// never retried: losing a race is reported as a conflict, unless the winner
// applied the same idempotency key, in which case this request is a replay.
//
// ============================================================================

pub const LINK_SUCCESS_MESSAGE: &str = "Foto vinculada ao pedido com sucesso!";

#[derive(Debug, Clone)]
pub struct PhotoLinkRequest {
    pub customer_email: String,
    /// Blank means "the customer's most recent order still in production"
    pub order_number: Option<String>,
    pub photo: PhotoUpload,
    pub idempotency_key: String,
    pub replace_existing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkResult {
    pub success: bool,
    pub message: String,
    pub order_number: OrderNumber,
    pub photo_reference: PhotoReference,
    /// True when the idempotency key had already been applied
    pub replayed: bool,
}

impl LinkResult {
    fn linked(order_number: OrderNumber, photo_reference: PhotoReference, replayed: bool) -> Self {
        Self {
            success: true,
            message: LINK_SUCCESS_MESSAGE.to_string(),
            order_number,
            photo_reference,
            replayed,
        }
    }
}

struct ValidatedRequest {
    email: Email,
    order_number: Option<OrderNumber>,
    photo: PhotoUpload,
    idempotency_key: String,
    replace_existing: bool,
}

pub struct PhotoLinkService {
    store: Arc<dyn OrderStore>,
    handler: OrderCommandHandler,
    photos: Arc<dyn PhotoStorage>,
    breaker: CircuitBreaker,
    settings: ServiceSettings,
    metrics: Option<Arc<Metrics>>,
}

impl PhotoLinkService {
    pub fn new(store: Arc<dyn OrderStore>, photos: Arc<dyn PhotoStorage>, settings: ServiceSettings) -> Self {
        Self {
            handler: OrderCommandHandler::new(store.clone()),
            store,
            photos,
            breaker: CircuitBreaker::new("photo_storage", settings.photo_breaker.clone()),
            settings,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn breaker_state(&self) -> CircuitState {
        self.breaker.get_state().await
    }

    /// Attach a photo to an order and mark it ready.
    ///
    /// # Errors
    ///
    /// - `Validation` for malformed input, before the store is touched
    /// - `NotFound` when no matching order exists for the email
    /// - `Conflict` when the order is already ready (without
    ///   `replace_existing`) or another link won the race
    /// - `Transient` when storage is down or the call timed out
    pub async fn link_photo(&self, request: PhotoLinkRequest) -> Result<LinkResult, ServiceError> {
        let started = Instant::now();

        let result = match tokio::time::timeout(self.settings.request_timeout, self.link_inner(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.settings.request_timeout.as_millis() as u64,
                    "Photo link timed out"
                );
                Err(ServiceError::Transient("photo link timed out".to_string()))
            }
        };

        let outcome = match &result {
            Ok(linked) if linked.replayed => "replayed",
            Ok(_) => "linked",
            Err(e) => e.kind(),
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_photo_link(outcome, started.elapsed().as_secs_f64());
        }

        result
    }

    async fn link_inner(&self, request: PhotoLinkRequest) -> Result<LinkResult, ServiceError> {
        let request = self.validate(request)?;
        let order = self.resolve_order(&request).await?;

        if order.has_applied(&request.idempotency_key) {
            return replayed(order);
        }
        if order.is_ready() && !request.replace_existing {
            return Err(OrderError::AlreadyReady(order.order_number).into());
        }

        let order_number = order.order_number.clone();
        let reference = self.store_photo(&order_number, request.photo).await?;

        let command = OrderCommand::LinkPhoto {
            photo: reference.clone(),
            idempotency_key: request.idempotency_key.clone(),
            replace_existing: request.replace_existing,
        };
        let correlation_id = Uuid::new_v4();

        match self.handler.execute(order, command, correlation_id).await {
            Ok(outcome) if outcome.events_applied == 0 => {
                self.discard_photo(&reference).await;
                replayed(outcome.order)
            }
            Ok(outcome) => {
                tracing::info!(
                    order_number = %order_number,
                    photo = %reference,
                    version = outcome.order.version,
                    correlation_id = %correlation_id,
                    "Photo linked to order"
                );
                Ok(LinkResult::linked(order_number, reference, false))
            }
            Err(e) => {
                self.discard_photo(&reference).await;

                if matches!(e, OrderCommandError::Store(StoreError::Conflict { .. })) {
                    if let Some(order) = self.applied_by_winner(&order_number, &request.idempotency_key).await? {
                        return replayed(order);
                    }
                }

                tracing::warn!(
                    order_number = %order_number,
                    error = %e,
                    correlation_id = %correlation_id,
                    "Photo link rejected"
                );
                Err(e.into())
            }
        }
    }

    /// The current order, if the append that beat us carried our key
    async fn applied_by_winner(
        &self,
        order_number: &OrderNumber,
        idempotency_key: &str,
    ) -> Result<Option<OrderAggregate>, ServiceError> {
        let store = self.store.as_ref();
        let order = read_with_retry(
            "order_store_find",
            &self.settings.read_retry,
            self.metrics.as_deref(),
            move || store.find(order_number),
        )
        .await?;

        Ok(order.filter(|order| order.has_applied(idempotency_key)))
    }

    fn validate(&self, request: PhotoLinkRequest) -> Result<ValidatedRequest, ServiceError> {
        let email = Email::parse(&request.customer_email)?;

        let order_number = match request.order_number.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(OrderNumber::parse(raw)?),
        };

        if request.photo.bytes.is_empty() {
            return Err(ValidationError::MissingPhoto.into());
        }

        let mime = request
            .photo
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !mime.starts_with("image/") || mime.len() == "image/".len() {
            return Err(ValidationError::UnsupportedContentType(request.photo.content_type).into());
        }

        if request.photo.bytes.len() > self.settings.max_photo_bytes {
            return Err(ValidationError::PhotoTooLarge {
                size: request.photo.bytes.len(),
                max: self.settings.max_photo_bytes,
            }
            .into());
        }

        let idempotency_key = request.idempotency_key.trim().to_string();
        if idempotency_key.is_empty() {
            return Err(ValidationError::MissingIdempotencyKey.into());
        }

        Ok(ValidatedRequest {
            email,
            order_number,
            photo: PhotoUpload {
                content_type: mime,
                ..request.photo
            },
            idempotency_key,
            replace_existing: request.replace_existing,
        })
    }

    async fn resolve_order(&self, request: &ValidatedRequest) -> Result<OrderAggregate, ServiceError> {
        let store = self.store.as_ref();
        let retry = &self.settings.read_retry;
        let metrics = self.metrics.as_deref();

        match &request.order_number {
            Some(number) => {
                let order = read_with_retry("order_store_find", retry, metrics, move || store.find(number)).await?;
                // An order under someone else's email is reported exactly like a missing one
                order
                    .filter(|order| order.customer_email == request.email)
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("order {} for {}", number, request.email))
                    })
            }
            None => {
                let email = &request.email;
                let orders = read_with_retry("order_store_get", retry, metrics, move || store.get(email)).await?;

                // A retried request must find the order it already made ready
                if let Some(order) = orders.iter().find(|o| o.has_applied(&request.idempotency_key)) {
                    return Ok(order.clone());
                }

                orders
                    .into_iter()
                    .find(|order| !order.is_ready())
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("no order in production for {}", request.email))
                    })
            }
        }
    }

    async fn store_photo(&self, order_number: &OrderNumber, photo: PhotoUpload) -> Result<PhotoReference, ServiceError> {
        let result = self.breaker.call(self.photos.put(order_number, photo)).await;

        if let Some(metrics) = &self.metrics {
            metrics.update_circuit_breaker_state(self.breaker.get_state().await);
        }

        match result {
            Ok(reference) => Ok(reference),
            Err(CircuitBreakerError::CircuitOpen) => {
                tracing::warn!(breaker = self.breaker.name(), "Photo upload refused, circuit open");
                Err(ServiceError::Transient("photo storage circuit open".to_string()))
            }
            Err(CircuitBreakerError::OperationFailed(e)) => Err(e.into()),
        }
    }

    async fn discard_photo(&self, reference: &PhotoReference) {
        if let Err(e) = self.photos.remove(reference).await {
            tracing::warn!(photo = %reference, error = %e, "Failed to remove orphaned photo");
        }
    }
}

fn replayed(order: OrderAggregate) -> Result<LinkResult, ServiceError> {
    let photo = order.photo.ok_or_else(|| {
        ServiceError::Internal(format!("order {} replayed without a photo", order.order_number))
    })?;
    tracing::info!(order_number = %order.order_number, "Photo link replayed");
    Ok(LinkResult::linked(order.order_number, photo, true))
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use async_trait::async_trait;
    use futures_util::future::join_all;

    use crate::domain::order::fixtures::{
        IN_PRODUCTION_EMAIL, IN_PRODUCTION_ORDER, NOT_FOUND_EMAIL, READY_EMAIL, READY_ORDER, READY_PHOTO,
    };
    use crate::domain::order::EventSourcedOrderStore;
    use crate::services::lookup::{OrderLookupService, OrderResult};
    use crate::services::photo_storage::{InMemoryPhotoStorage, StorageError, StoredPhoto};
    use crate::services::testing::{fast_settings, seeded_store, FlakyStore};
    use crate::utils::CircuitBreakerConfig;

    struct Fixture {
        store: Arc<EventSourcedOrderStore>,
        photos: Arc<InMemoryPhotoStorage>,
        service: PhotoLinkService,
    }

    async fn fixture() -> Fixture {
        let store = seeded_store().await;
        let photos = Arc::new(InMemoryPhotoStorage::new());
        let service = PhotoLinkService::new(store.clone(), photos.clone(), fast_settings());
        Fixture { store, photos, service }
    }

    fn jpeg() -> PhotoUpload {
        PhotoUpload {
            filename: "caneca.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
        }
    }

    fn request(email: &str, order_number: Option<&str>, key: &str) -> PhotoLinkRequest {
        PhotoLinkRequest {
            customer_email: email.to_string(),
            order_number: order_number.map(str::to_string),
            photo: jpeg(),
            idempotency_key: key.to_string(),
            replace_existing: false,
        }
    }

    #[tokio::test]
    async fn test_link_makes_order_ready() {
        let fx = fixture().await;

        let result = fx
            .service
            .link_photo(request(IN_PRODUCTION_EMAIL, Some(IN_PRODUCTION_ORDER), "k1"))
            .await
            .unwrap();
        assert!(result.success);
        assert!(!result.replayed);
        assert_eq!(result.message, LINK_SUCCESS_MESSAGE);
        assert_eq!(result.order_number.as_str(), IN_PRODUCTION_ORDER);

        let lookup = OrderLookupService::new(fx.store.clone(), fast_settings());
        assert_eq!(
            lookup.lookup(IN_PRODUCTION_EMAIL).await.unwrap(),
            OrderResult::Ready {
                order_number: result.order_number.clone(),
                photo_reference: result.photo_reference.clone(),
            }
        );

        let stored = fx.photos.get(result.photo_reference.as_str()).await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn test_link_without_order_number_picks_order_in_production() {
        let fx = fixture().await;

        let result = fx
            .service
            .link_photo(request(IN_PRODUCTION_EMAIL, None, "k1"))
            .await
            .unwrap();
        assert_eq!(result.order_number.as_str(), IN_PRODUCTION_ORDER);

        let blank = fx
            .service
            .link_photo(request(IN_PRODUCTION_EMAIL, Some("  "), "k2"))
            .await;
        // Nothing left in production once the only order is ready
        assert!(matches!(blank, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_email_is_not_found() {
        let fx = fixture().await;

        let result = fx.service.link_photo(request(NOT_FOUND_EMAIL, None, "k1")).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));

        let result = fx
            .service
            .link_photo(request(NOT_FOUND_EMAIL, Some("PET-2025-999"), "k1"))
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert_eq!(fx.photos.len().await, 0);
    }

    #[tokio::test]
    async fn test_order_of_another_customer_is_not_found() {
        let fx = fixture().await;

        let result = fx
            .service
            .link_photo(request(READY_EMAIL, Some(IN_PRODUCTION_ORDER), "k1"))
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_ready_order_requires_replace_flag() {
        let fx = fixture().await;

        let result = fx
            .service
            .link_photo(request(READY_EMAIL, Some(READY_ORDER), "k1"))
            .await;
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
        assert_eq!(fx.photos.len().await, 0);

        let mut replace = request(READY_EMAIL, Some(READY_ORDER), "k2");
        replace.replace_existing = true;
        let result = fx.service.link_photo(replace).await.unwrap();
        assert_ne!(result.photo_reference.as_str(), READY_PHOTO);

        let order = fx.store.find(&result.order_number).await.unwrap().unwrap();
        assert_eq!(order.photo, Some(result.photo_reference));
    }

    #[tokio::test]
    async fn test_same_idempotency_key_is_replayed() {
        let fx = fixture().await;

        let first = fx
            .service
            .link_photo(request(IN_PRODUCTION_EMAIL, None, "upload-1"))
            .await
            .unwrap();
        let second = fx
            .service
            .link_photo(request(IN_PRODUCTION_EMAIL, None, "upload-1"))
            .await
            .unwrap();

        assert!(second.replayed);
        assert_eq!(second.photo_reference, first.photo_reference);
        assert_eq!(fx.photos.len().await, 1);

        let order = fx.store.find(&first.order_number).await.unwrap().unwrap();
        assert_eq!(order.version, 2);
    }

    #[tokio::test]
    async fn test_validation_happens_before_store_calls() {
        let store = Arc::new(FlakyStore::new(seeded_store().await, 0));
        let service = PhotoLinkService::new(store.clone(), Arc::new(InMemoryPhotoStorage::new()), fast_settings());

        let mut empty = request(IN_PRODUCTION_EMAIL, None, "k1");
        empty.photo.bytes.clear();
        assert!(matches!(
            service.link_photo(empty).await,
            Err(ServiceError::Validation(ValidationError::MissingPhoto))
        ));

        let mut pdf = request(IN_PRODUCTION_EMAIL, None, "k1");
        pdf.photo.content_type = "application/pdf".to_string();
        assert!(matches!(
            service.link_photo(pdf).await,
            Err(ServiceError::Validation(ValidationError::UnsupportedContentType(_)))
        ));

        assert!(matches!(
            service.link_photo(request("nao-e-email", None, "k1")).await,
            Err(ServiceError::Validation(ValidationError::InvalidEmail(_)))
        ));

        assert!(matches!(
            service.link_photo(request(IN_PRODUCTION_EMAIL, None, "  ")).await,
            Err(ServiceError::Validation(ValidationError::MissingIdempotencyKey))
        ));

        assert_eq!(store.reads(), 0);
    }

    #[tokio::test]
    async fn test_photo_size_limit() {
        let store = seeded_store().await;
        let settings = ServiceSettings {
            max_photo_bytes: 3,
            ..fast_settings()
        };
        let service = PhotoLinkService::new(store, Arc::new(InMemoryPhotoStorage::new()), settings);

        let result = service.link_photo(request(IN_PRODUCTION_EMAIL, None, "k1")).await;
        assert!(matches!(
            result,
            Err(ServiceError::Validation(ValidationError::PhotoTooLarge { size: 4, max: 3 }))
        ));
    }

    #[tokio::test]
    async fn test_content_type_parameters_are_accepted() {
        let fx = fixture().await;
        let mut req = request(IN_PRODUCTION_EMAIL, None, "k1");
        req.photo.content_type = "Image/PNG; charset=binary".to_string();

        let result = fx.service.link_photo(req).await.unwrap();
        assert!(result.photo_reference.as_str().ends_with(".png"));
    }

    #[tokio::test]
    async fn test_order_reads_are_retried() {
        let flaky = Arc::new(FlakyStore::new(seeded_store().await, 2));
        let service = PhotoLinkService::new(flaky.clone(), Arc::new(InMemoryPhotoStorage::new()), fast_settings());

        let result = service
            .link_photo(request(IN_PRODUCTION_EMAIL, Some(IN_PRODUCTION_ORDER), "k1"))
            .await;
        assert!(result.is_ok());
        assert_eq!(flaky.reads(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_links_yield_one_winner() {
        let fx = fixture().await;
        let service = Arc::new(fx.service);

        let attempts = (0..8).map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .link_photo(request(IN_PRODUCTION_EMAIL, Some(IN_PRODUCTION_ORDER), &format!("k{}", i)))
                    .await
            })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(ServiceError::Conflict(_)))));

        let order = fx
            .store
            .find(&OrderNumber::parse(IN_PRODUCTION_ORDER).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.version, 2);
        assert_eq!(order.photo.as_ref(), Some(&winners[0].photo_reference));

        // Photos uploaded by losers of the race are cleaned up
        assert_eq!(fx.photos.len().await, 1);
    }

    struct BrokenStorage;

    #[async_trait]
    impl PhotoStorage for BrokenStorage {
        async fn put(&self, _: &OrderNumber, _: PhotoUpload) -> Result<PhotoReference, StorageError> {
            Err(StorageError::Unavailable("disk full".to_string()))
        }

        async fn get(&self, _: &str) -> Result<Option<StoredPhoto>, StorageError> {
            Ok(None)
        }

        async fn remove(&self, _: &PhotoReference) -> Result<bool, StorageError> {
            Ok(false)
        }
    }

    /// Holds every upload long enough for a second request to catch up
    struct SlowStorage {
        inner: InMemoryPhotoStorage,
        delay: Duration,
    }

    #[async_trait]
    impl PhotoStorage for SlowStorage {
        async fn put(&self, order_number: &OrderNumber, photo: PhotoUpload) -> Result<PhotoReference, StorageError> {
            tokio::time::sleep(self.delay).await;
            self.inner.put(order_number, photo).await
        }

        async fn get(&self, reference: &str) -> Result<Option<StoredPhoto>, StorageError> {
            self.inner.get(reference).await
        }

        async fn remove(&self, reference: &PhotoReference) -> Result<bool, StorageError> {
            self.inner.remove(reference).await
        }
    }

    #[tokio::test]
    async fn test_in_flight_retry_with_same_key_is_replayed() {
        let store = seeded_store().await;
        let photos = Arc::new(SlowStorage {
            inner: InMemoryPhotoStorage::new(),
            delay: Duration::from_millis(50),
        });
        let service = PhotoLinkService::new(store.clone(), photos.clone(), fast_settings());

        let (a, b) = tokio::join!(
            service.link_photo(request(IN_PRODUCTION_EMAIL, Some(IN_PRODUCTION_ORDER), "same-key")),
            service.link_photo(request(IN_PRODUCTION_EMAIL, Some(IN_PRODUCTION_ORDER), "same-key")),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(a.replayed != b.replayed);
        assert_eq!(a.photo_reference, b.photo_reference);

        let order = store
            .find(&OrderNumber::parse(IN_PRODUCTION_ORDER).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.version, 2);
        assert_eq!(order.photo.as_ref(), Some(&a.photo_reference));

        // The replayed request's upload is discarded
        assert_eq!(photos.inner.len().await, 1);
    }

    #[tokio::test]
    async fn test_storage_failures_open_the_breaker() {
        let store = seeded_store().await;
        let settings = ServiceSettings {
            photo_breaker: CircuitBreakerConfig {
                failure_threshold: 2,
                timeout: Duration::from_secs(60),
                success_threshold: 1,
            },
            ..fast_settings()
        };
        let service = PhotoLinkService::new(store.clone(), Arc::new(BrokenStorage), settings);

        for key in ["k1", "k2", "k3"] {
            let result = service.link_photo(request(IN_PRODUCTION_EMAIL, None, key)).await;
            assert!(matches!(result, Err(ServiceError::Transient(_))));
        }
        assert_eq!(service.breaker_state().await, CircuitState::Open);

        // The order is untouched
        let order = store
            .find(&OrderNumber::parse(IN_PRODUCTION_ORDER).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(!order.is_ready());
    }

    #[tokio::test]
    async fn test_link_records_metrics() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let fx = fixture().await;
        let service = fx.service.with_metrics(metrics.clone());

        service.link_photo(request(IN_PRODUCTION_EMAIL, None, "k1")).await.unwrap();
        service.link_photo(request(IN_PRODUCTION_EMAIL, None, "k1")).await.unwrap();
        let _ = service.link_photo(request(NOT_FOUND_EMAIL, None, "k2")).await;

        assert_eq!(metrics.photo_links_total.with_label_values(&["linked"]).get(), 1);
        assert_eq!(metrics.photo_links_total.with_label_values(&["replayed"]).get(), 1);
        assert_eq!(metrics.photo_links_total.with_label_values(&["not_found"]).get(), 1);
    }
}
