//! Orderflow Service - Entry Point
//!
//! Initializes configuration, logging, the order repository backend,
//! and the HTTP facade. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml (optional) + env overrides + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Construct the repository backend (file or postgres) + migrate
//! 4. Construct the HMAC guard and webhook notifier
//! 5. Construct the OrderService over the ports
//! 6. Serve the axum facade with graceful shutdown
//! 7. On SIGINT: drain connections, then release the repository

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

mod adapters;
mod config;
mod domain;
mod ports;
mod usecases;

use adapters::http::auth::HmacGuard;
use adapters::http::{AppState, router};
use adapters::persistence::{FileOrderStore, PgOrderStore};
use adapters::webhook::WebhookNotifier;
use config::StorageBackend;
use ports::repository::OrderRepository;
use usecases::OrderService;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config = config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.service.log_level)
                }),
        )
        .json()
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?config.storage.backend,
        bind = %config.service.bind_address,
        "Starting Orderflow Service"
    );

    // ── 3. Construct + provision the repository backend ─────
    let repo: Arc<dyn OrderRepository> = match config.storage.backend {
        StorageBackend::File => Arc::new(
            FileOrderStore::new(&config.storage.data_dir)
                .await
                .context("Failed to open file order store")?,
        ),
        StorageBackend::Postgres => {
            let url = config
                .storage
                .database_url
                .as_deref()
                .context("postgres backend selected without a database URL")?;
            Arc::new(
                PgOrderStore::connect(url)
                    .await
                    .context("Failed to connect to PostgreSQL")?,
            )
        }
    };
    repo.initialize()
        .await
        .context("Failed to provision order storage")?;

    // ── 4. Auth guard + webhook notifier ────────────────────
    if config.auth.secret.is_none() {
        warn!(
            "No HMAC secret configured - sensitive reads and mutations \
             will reject every request"
        );
    }
    let guard = Arc::new(HmacGuard::new(
        config.auth.secret.clone(),
        config.auth.max_skew_seconds,
    ));
    let notifier = Arc::new(
        WebhookNotifier::new(
            config.webhook.url.clone(),
            Duration::from_millis(config.webhook.timeout_ms),
        )
        .context("Failed to build webhook notifier")?,
    );

    // ── 5. Order service over the ports ─────────────────────
    let service = Arc::new(OrderService::new(Arc::clone(&repo), notifier));

    // ── 6. Serve the facade until SIGINT ────────────────────
    let app = router(AppState { service, guard });
    let listener = tokio::net::TcpListener::bind(&config.service.bind_address)
        .await
        .with_context(|| {
            format!("Failed to bind {}", config.service.bind_address)
        })?;
    info!(address = %config.service.bind_address, "Orderflow service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // ── 7. Release storage ──────────────────────────────────
    info!("Draining complete, closing repository");
    repo.close().await?;

    info!("Shutdown complete");
    Ok(())
}

/// Resolve when SIGINT is received.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("SIGINT received, initiating graceful shutdown");
}
