//! # api-adapters
//!
//! The HTTP routing and orchestration layer for the ad engine.

pub mod metrics;
pub mod responses;

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod middleware;
#[cfg(feature = "web-axum")]
pub mod state;

pub use metrics::AdMetrics;
#[cfg(feature = "web-axum")]
pub use state::AppState;

/// Builds the full router: ad routes, cron, admin review and operational
/// endpoints, wrapped in the standard middleware stack.
///
/// # Developer Note
/// `/api/ads/lobby`, `/api/ads/replay` and `/api/ads/impression` are static
/// segments and win over `/api/ads/{id}`.
#[cfg(feature = "web-axum")]
pub fn router(state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    let routes = axum::Router::new()
        // Placements
        .route("/api/ads/lobby", get(handlers::lobby_ads))
        .route("/api/ads/replay", get(handlers::replay_ad))
        .route("/api/ads/impression", post(handlers::record_impression))
        // Submission & lookup
        .route("/api/ads", post(handlers::submit_ad))
        .route("/api/ads/{id}", get(handlers::get_ad))
        // Admin review
        .route("/api/admin/ads/{id}/approve", post(handlers::approve_ad))
        .route("/api/admin/ads/{id}/reject", post(handlers::reject_ad))
        // Scheduled sweep, also invocable by hand
        .route(
            "/api/cron/expire-ads",
            get(handlers::expire_ads).post(handlers::expire_ads),
        )
        // Operations
        .route("/health", get(handlers::health))
        .route("/health/db", get(handlers::db_health))
        .route("/metrics", get(handlers::metrics))
        .with_state(state);

    middleware::apply(routes)
}
