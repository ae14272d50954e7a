//! # seed
//!
//! Loads a demo room with one ad in every interesting lifecycle position so
//! the lobby, replay and expiry paths can be exercised by hand.
//!
//! Usage: `seed [room_id]` (defaults to `demo-room`). Reads the database URL
//! the same way the server does.

use std::time::Duration;

use anyhow::Context;
use chrono::{Duration as ChronoDuration, Utc};
use configs::Settings;
use domains::{Ad, AdPolicy, AdRepository, AdStatus, NewAd};
use secrecy::ExposeSecret;
use storage_adapters::PgAdRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let room_id = std::env::args().nth(1).unwrap_or_else(|| "demo-room".into());
    let settings = Settings::load().context("loading settings")?;
    let url = settings
        .database
        .url
        .as_ref()
        .context("DATABASE_URL is required")?;

    let repo = PgAdRepository::connect(url.expose_secret(), 2, Duration::from_secs(10))
        .await
        .context("connecting to postgres")?;
    repo.migrate().await.context("running migrations")?;

    let policy = AdPolicy::new(settings.policy.impression_cap, settings.policy.max_age_days);
    for ad in demo_ads(&room_id, policy) {
        repo.insert_ad(&ad)
            .await
            .with_context(|| format!("inserting {}", ad.title))?;
        tracing::info!(id = %ad.id, title = %ad.title, status = %ad.status, "seeded");
    }

    tracing::info!(%room_id, "seed complete");
    Ok(())
}

fn demo_ads(room_id: &str, policy: AdPolicy) -> Vec<Ad> {
    let now = Utc::now();
    let ad = |title: &str, status: AdStatus, approved_days_ago: Option<i64>| {
        let mut ad = Ad::submitted(
            NewAd {
                room_id: room_id.to_string(),
                session_id: None,
                advertiser_id: Some("demo-advertiser".into()),
                title: title.to_string(),
                video_url: format!(
                    "https://cdn.kaboom.example/demo/{}.mp4",
                    title.to_lowercase().replace(' ', "-")
                ),
            },
            now - ChronoDuration::days(approved_days_ago.unwrap_or(0) + 1),
        );
        ad.status = status;
        ad.approved_at = approved_days_ago.map(|d| now - ChronoDuration::days(d));
        ad
    };

    let fresh = ad("Fresh Launch", AdStatus::Active, Some(1));

    let mut midway = ad("Midway Promo", AdStatus::Active, Some(5));
    midway.lobby_impressions = policy.impression_cap / 2;
    midway.impressions_count = 40;
    midway.replay_impressions = 40;

    let mut near_cap = ad("Almost Done", AdStatus::Active, Some(10));
    near_cap.impressions_count = (policy.impression_cap - 5).max(0);
    near_cap.replay_impressions = near_cap.impressions_count;

    let aging = ad("Aging Spot", AdStatus::Active, Some(policy.max_age_days - 1));
    let stale = ad("Stale Spot", AdStatus::Active, Some(policy.max_age_days + 2));
    let pending = ad("Awaiting Review", AdStatus::Pending, None);

    vec![fresh, midway, near_cap, aging, stale, pending]
}
