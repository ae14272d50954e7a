//! # api-adapters Handlers
//!
//! This module coordinates the flow between HTTP requests and `AdService`.
//! Handlers only extract input, call the service and shape the JSON envelope.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use domains::NewAd;
use serde::Deserialize;
use services::ImpressionRequest;
use uuid::Uuid;

use crate::error::ApiError;
use crate::responses::{
    AdResponse, DbHealthResponse, HealthResponse, LobbyResponse, MessageResponse, ReplayResponse,
    SweepResponse,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LobbyParams {
    pub room_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReplayParams {
    pub room_id: Option<String>,
    pub session_id: Option<String>,
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

fn parse_ad_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("ad id must be a UUID"))
}

/// GET /api/ads/lobby?room_id=
#[tracing::instrument(name = "GET /api/ads/lobby", skip(state))]
pub async fn lobby_ads(
    State(state): State<AppState>,
    Query(params): Query<LobbyParams>,
) -> Result<Json<LobbyResponse>, ApiError> {
    let ads = state.service.lobby_ads(params.room_id.as_deref()).await?;
    Ok(Json(LobbyResponse {
        success: true,
        count: ads.len(),
        ads,
    }))
}

/// GET /api/ads/replay?room_id=&session_id=
#[tracing::instrument(name = "GET /api/ads/replay", skip(state))]
pub async fn replay_ad(
    State(state): State<AppState>,
    Query(params): Query<ReplayParams>,
) -> Result<Json<ReplayResponse>, ApiError> {
    let picked = state
        .service
        .replay_ad(params.room_id.as_deref(), params.session_id.as_deref())
        .await?;

    let response = match picked {
        Some(ad) => ReplayResponse {
            success: true,
            ads: Some(vec![ad]),
            message: None,
        },
        None => {
            state.metrics.replay_fallbacks.inc();
            ReplayResponse {
                success: true,
                ads: None,
                message: Some("No ads available".to_string()),
            }
        }
    };
    Ok(Json(response))
}

/// POST /api/ads/impression
#[tracing::instrument(name = "POST /api/ads/impression", skip(state, body))]
pub async fn record_impression(
    State(state): State<AppState>,
    body: Result<Json<ImpressionRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let recorded = state.service.record_impression(request).await?;
    state.metrics.impressions_recorded.inc();
    if recorded.just_expired {
        state.metrics.ads_expired.inc();
    }

    Ok(Json(MessageResponse::ok("Impression recorded")))
}

/// GET|POST /api/cron/expire-ads
#[tracing::instrument(name = "/api/cron/expire-ads", skip_all)]
pub async fn expire_ads(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SweepResponse>, ApiError> {
    state.cron_guard.authorize(authorization(&headers))?;

    let report = state.service.expire_sweep().await?;
    state.metrics.observe_sweep(report.expired);

    Ok(Json(SweepResponse {
        success: true,
        message: format!("Expired {} ads", report.expired),
        expired: report.expired,
        ads: report.ads,
    }))
}

/// POST /api/ads
#[tracing::instrument(name = "POST /api/ads", skip(state, body))]
pub async fn submit_ad(
    State(state): State<AppState>,
    body: Result<Json<NewAd>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(new) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let ad = state.service.submit_ad(new).await?;
    Ok((StatusCode::CREATED, Json(AdResponse { success: true, ad })))
}

/// GET /api/ads/{id}
#[tracing::instrument(name = "GET /api/ads/{id}", skip(state))]
pub async fn get_ad(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AdResponse>, ApiError> {
    let ad = state.service.get_ad(parse_ad_id(&id)?).await?;
    Ok(Json(AdResponse { success: true, ad }))
}

/// POST /api/admin/ads/{id}/approve
#[tracing::instrument(name = "POST /api/admin/ads/{id}/approve", skip(state, headers))]
pub async fn approve_ad(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<AdResponse>, ApiError> {
    state.admin_guard.authorize(authorization(&headers))?;
    let ad = state.service.approve_ad(parse_ad_id(&id)?).await?;
    Ok(Json(AdResponse { success: true, ad }))
}

/// POST /api/admin/ads/{id}/reject
#[tracing::instrument(name = "POST /api/admin/ads/{id}/reject", skip(state, headers))]
pub async fn reject_ad(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<AdResponse>, ApiError> {
    state.admin_guard.authorize(authorization(&headers))?;
    let ad = state.service.reject_ad(parse_ad_id(&id)?).await?;
    Ok(Json(AdResponse { success: true, ad }))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/db
#[tracing::instrument(name = "GET /health/db", skip(state))]
pub async fn db_health(State(state): State<AppState>) -> Result<Json<DbHealthResponse>, ApiError> {
    let started = Instant::now();
    state.service.ping().await?;
    Ok(Json(DbHealthResponse {
        rtt_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    }))
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| ApiError::internal(format!("metrics encoding failed: {e}")))?;
    Ok((
        [(
            axum::http::header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        body,
    ))
}
