//! Shared harness: a full router over the in-memory store.

#![allow(dead_code)]

use std::sync::Arc;

use api_adapters::{router, AdMetrics, AppState};
use auth_adapters::BearerSecret;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use domains::{Ad, AdPolicy, AdStatus, Clock, NewAd};
use secrecy::SecretString;
use serde_json::Value;
use services::AdService;
use storage_adapters::MemoryAdRepository;
use tower::ServiceExt;
use uuid::Uuid;

pub const CRON_SECRET: &str = "tick-tock";
pub const ADMIN_SECRET: &str = "reviewer";

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryAdRepository>,
    pub metrics: Arc<AdMetrics>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(AdPolicy::default(), None)
    }

    pub fn with_policy(policy: AdPolicy) -> Self {
        Self::build(policy, None)
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::build(AdPolicy::default(), Some(clock))
    }

    fn build(policy: AdPolicy, clock: Option<Arc<dyn Clock>>) -> Self {
        let repo = Arc::new(MemoryAdRepository::new());
        let mut service = AdService::new(repo.clone(), policy);
        if let Some(clock) = clock {
            service = service.with_clock(clock);
        }
        let metrics = Arc::new(AdMetrics::new());
        let state = AppState::new(
            service,
            Arc::new(BearerSecret::new(
                "cron",
                Some(SecretString::from(CRON_SECRET.to_string())),
            )),
            Arc::new(BearerSecret::new(
                "admin",
                Some(SecretString::from(ADMIN_SECRET.to_string())),
            )),
            metrics.clone(),
        );
        Self {
            router: router(state),
            repo,
            metrics,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn lobby(&self, room_id: &str) -> Vec<Uuid> {
        let (status, body) = self.send(get(&format!("/api/ads/lobby?room_id={room_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        ids(&body["ads"])
    }

    pub async fn replay(&self, room_id: &str) -> Option<Uuid> {
        let (status, body) = self.send(get(&format!("/api/ads/replay?room_id={room_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        ids(&body["ads"]).first().copied()
    }

    pub async fn impression(&self, ad_id: Uuid, view_type: &str) -> StatusCode {
        let body = serde_json::json!({ "ad_id": ad_id, "view_type": view_type, "viewer_id": "viewer" });
        self.send(post_json("/api/ads/impression", body)).await.0
    }

    pub async fn sweep(&self) -> Value {
        let (status, body) = self
            .send(bearer(Method::POST, "/api/cron/expire-ads", CRON_SECRET))
            .await;
        assert_eq!(status, StatusCode::OK);
        body
    }
}

pub fn ids(ads: &Value) -> Vec<Uuid> {
    ads.as_array()
        .map(|ads| {
            ads.iter()
                .map(|ad| ad["id"].as_str().unwrap().parse().unwrap())
                .collect()
        })
        .unwrap_or_default()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn bearer(method: Method, uri: &str, secret: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {secret}"))
        .body(Body::empty())
        .unwrap()
}

/// An active ad in `room_id`, approved `approved_days_ago` days before `now`.
pub fn active_ad(room_id: &str, now: DateTime<Utc>, approved_days_ago: i64) -> Ad {
    let mut ad = Ad::submitted(
        NewAd {
            room_id: room_id.to_string(),
            session_id: None,
            advertiser_id: Some("adv".into()),
            title: "Spot".into(),
            video_url: "https://cdn.example/spot.mp4".into(),
        },
        now - Duration::days(approved_days_ago + 1),
    );
    ad.status = AdStatus::Active;
    ad.approved_at = Some(now - Duration::days(approved_days_ago));
    ad
}
