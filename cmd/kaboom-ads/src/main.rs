//! # kaboom-ads
//!
//! The entry point that assembles the ad service from settings and the
//! compiled-in adapters.

mod sweeper;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api_adapters::{AdMetrics, AppState};
use auth_adapters::BearerSecret;
use configs::{LogFormat, Settings, StoreBackend};
use domains::{AccessGuard, AdPolicy, AdRepository};
use services::AdService;
use storage_adapters::MemoryAdRepository;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::sweeper::Sweeper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings);

    // 1. Store
    let repo = build_repository(&settings).await?;

    // 2. Service
    let policy = AdPolicy::new(settings.policy.impression_cap, settings.policy.max_age_days);
    let service = AdService::new(repo, policy);

    // 3. Access guards
    let cron_guard = BearerSecret::new("cron", settings.auth.cron_secret.clone());
    if !cron_guard.is_enforced() {
        tracing::warn!("CRON_SECRET is not set; /api/cron/expire-ads is open");
    }
    let admin_guard = BearerSecret::new("admin", settings.auth.admin_secret.clone());
    if !admin_guard.is_enforced() {
        tracing::warn!("auth.admin_secret is not set; /api/admin routes are open");
    }

    let metrics = Arc::new(AdMetrics::new());
    let state = AppState::new(
        service.clone(),
        Arc::new(cron_guard),
        Arc::new(admin_guard),
        metrics.clone(),
    );

    // 4. Background expiry sweep
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper_handle = settings.sweeper.enabled.then(|| {
        Sweeper::new(
            service,
            metrics,
            Duration::from_secs(settings.sweeper.interval_secs),
        )
        .spawn(shutdown_rx)
    });

    // 5. HTTP
    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, ?policy, "kaboom-ads listening");

    axum::serve(listener, api_adapters::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = sweeper_handle {
        let _ = handle.await;
    }
    tracing::info!("kaboom-ads stopped");
    Ok(())
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));

    match settings.log.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn build_repository(settings: &Settings) -> anyhow::Result<Arc<dyn AdRepository>> {
    match settings.database.backend {
        #[cfg(feature = "db-postgres")]
        StoreBackend::Postgres => {
            use secrecy::ExposeSecret;

            let url = settings
                .database
                .url
                .as_ref()
                .context("database.url is required for the postgres backend")?;
            let repo = storage_adapters::PgAdRepository::connect(
                url.expose_secret(),
                settings.database.max_connections,
                Duration::from_secs(settings.database.acquire_timeout_secs),
            )
            .await
            .context("connecting to postgres")?;

            if settings.database.run_migrations {
                repo.migrate().await.context("running migrations")?;
                tracing::info!("migrations applied");
            }
            Ok(Arc::new(repo))
        }
        #[cfg(not(feature = "db-postgres"))]
        StoreBackend::Postgres => anyhow::bail!("built without the db-postgres feature"),
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryAdRepository::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
