use std::sync::Arc;
use actix_web::web;
use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod domain;
mod event_sourcing;
mod messaging;
mod metrics;
mod services;
mod utils;

use config::AppConfig;
use domain::order::{EventSourcedOrderStore, OrderStore};
use messaging::{LogNotificationSink, NotificationRelay};
use services::{InMemoryPhotoStorage, OrderLookupService, OrderRegistrationService, PhotoLinkService, PhotoStorage};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Values from .env never override the real environment
    dotenvy::dotenv().ok();

    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,petloo_tracker=debug"))
        )
        .init();

    tracing::info!("🚀 Starting Petloo order tracker");

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::debug!(?config, "Loaded configuration");

    // === 1. Prometheus metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    if config.server.metrics_port != 0 {
        let registry = Arc::new(metrics.registry().clone());
        let host = config.server.host.clone();
        let port = config.server.metrics_port;
        actix_web::rt::spawn(async move {
            if let Err(e) = metrics::start_metrics_server(registry, host, port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    } else {
        tracing::info!("Metrics server disabled");
    }

    // === 2. Order store and photo storage ===
    let store: Arc<dyn OrderStore> = Arc::new(EventSourcedOrderStore::new());
    let photos: Arc<dyn PhotoStorage> = Arc::new(InMemoryPhotoStorage::new());

    let registration = OrderRegistrationService::new(store.clone());
    if config.seed_fixtures {
        registration
            .seed_demo_orders(photos.as_ref())
            .await
            .context("failed to seed demo orders")?;
    }

    // === 3. Customer notifications from the outbox ===
    let relay = NotificationRelay::new(
        store.clone(),
        Arc::new(LogNotificationSink),
        config.notifications.clone(),
    )
    .with_metrics(metrics.clone());
    Arc::new(relay).spawn();

    // === 4. Public API ===
    let state = web::Data::new(api::AppState {
        lookup: OrderLookupService::new(store.clone(), config.service.clone()).with_metrics(metrics.clone()),
        photo_link: PhotoLinkService::new(store.clone(), photos.clone(), config.service.clone())
            .with_metrics(metrics.clone()),
        registration,
        photos,
    });

    tracing::warn!("⚠️ Admin endpoints (/api/admin/*) are not authenticated; expose them only on a trusted network");

    api::start_api_server(
        state,
        config.server.host.clone(),
        config.server.http_port,
        config.service.max_photo_bytes,
    )
    .await
    .context("API server failed")?;

    tracing::info!("👋 Shutting down");
    Ok(())
}
