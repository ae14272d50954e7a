//! # AdService
//!
//! Orchestrates the ad lifecycle: lobby and replay eligibility, the
//! impression recorder and the expiry sweep. Input validation happens here,
//! before any port is touched, so a rejected request never writes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use domains::{
    Ad, AdPolicy, AdRepository, AdStatus, Clock, DomainError, NewAd, NewImpression,
    RecordedImpression, Result, ViewType,
};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::SystemClock;

/// Raw impression payload as submitted by a replay player.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImpressionRequest {
    pub ad_id: Option<String>,
    pub view_type: Option<String>,
    pub viewer_id: Option<String>,
    pub session_id: Option<String>,
}

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub expired: usize,
    pub ads: Vec<Ad>,
    pub swept_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AdService {
    repo: Arc<dyn AdRepository>,
    clock: Arc<dyn Clock>,
    policy: AdPolicy,
}

impl AdService {
    pub fn new(repo: Arc<dyn AdRepository>, policy: AdPolicy) -> Self {
        Self {
            repo,
            clock: Arc::new(SystemClock),
            policy,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> AdPolicy {
        self.policy
    }

    pub async fn ping(&self) -> Result<()> {
        self.repo.ping().await
    }

    /// Ads allowed to rotate in a room's lobby, in random order.
    #[tracing::instrument(name = "ads.lobby", skip(self))]
    pub async fn lobby_ads(&self, room_id: Option<&str>) -> Result<Vec<Ad>> {
        let room_id = require("room_id", room_id)?;

        let mut ads: Vec<Ad> = self
            .repo
            .list_active_by_room(room_id)
            .await?
            .into_iter()
            .filter(|ad| self.policy.is_lobby_eligible(ad))
            .collect();
        shuffle(&mut ads);

        tracing::debug!(room_id, eligible = ads.len(), "lobby ads selected");
        Ok(ads)
    }

    /// Picks the single replay pre-roll ad for a room, or `None` when the
    /// caller should fall back to its house promo.
    #[tracing::instrument(name = "ads.replay", skip(self))]
    pub async fn replay_ad(
        &self,
        room_id: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<Option<Ad>> {
        let room_id = require("room_id", room_id)?;
        let now = self.clock.now();

        let mut candidates: Vec<Ad> = self
            .repo
            .list_replay_candidates(room_id, self.policy, now)
            .await?
            .into_iter()
            .filter(|ad| self.policy.is_replay_eligible(ad, now))
            .collect();

        if candidates.is_empty() {
            tracing::debug!(room_id, "no replay ad eligible");
            return Ok(None);
        }

        shuffle(&mut candidates);
        let picked = candidates.swap_remove(0);
        tracing::debug!(room_id, ad_id = %picked.id, "replay ad selected");
        Ok(Some(picked))
    }

    /// Records a replay impression and enforces the impression cap.
    #[tracing::instrument(name = "ads.impression", skip(self, request), fields(ad_id = tracing::field::Empty))]
    pub async fn record_impression(&self, request: ImpressionRequest) -> Result<RecordedImpression> {
        let impression = self.validate_impression(request)?;
        tracing::Span::current().record("ad_id", tracing::field::display(impression.ad_id));

        let recorded = self
            .repo
            .record_impression(impression, self.policy)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "impression not recorded"))?;

        if recorded.just_expired {
            tracing::info!(
                impressions = recorded.impressions_count,
                "ad reached impression cap and expired"
            );
        }
        Ok(recorded)
    }

    /// Expires every active ad past the impression cap or the age window.
    #[tracing::instrument(name = "ads.expire_sweep", skip(self))]
    pub async fn expire_sweep(&self) -> Result<SweepReport> {
        let now = self.clock.now();
        let ads = self
            .repo
            .expire_stale(self.policy, now)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "expiry sweep failed"))?;

        if ads.is_empty() {
            tracing::debug!("expiry sweep found nothing to expire");
        } else {
            let ids: Vec<String> = ads.iter().map(|ad| ad.id.to_string()).collect();
            tracing::info!(expired = ads.len(), ids = ?ids, "expiry sweep expired ads");
        }

        Ok(SweepReport {
            expired: ads.len(),
            ads,
            swept_at: now,
        })
    }

    /// Stores an advertiser submission as `pending`.
    #[tracing::instrument(name = "ads.submit", skip(self, new), fields(room_id = %new.room_id))]
    pub async fn submit_ad(&self, new: NewAd) -> Result<Ad> {
        let new = NewAd {
            room_id: require("room_id", Some(new.room_id.as_str()))?.to_string(),
            title: require("title", Some(new.title.as_str()))?.to_string(),
            video_url: require("video_url", Some(new.video_url.as_str()))?.to_string(),
            session_id: non_blank(new.session_id),
            advertiser_id: non_blank(new.advertiser_id),
        };

        let ad = Ad::submitted(new, self.clock.now());
        self.repo.insert_ad(&ad).await?;
        tracing::info!(ad_id = %ad.id, "ad submitted for review");
        Ok(ad)
    }

    #[tracing::instrument(name = "ads.approve", skip(self))]
    pub async fn approve_ad(&self, id: Uuid) -> Result<Ad> {
        let ad = self
            .repo
            .transition_status(id, AdStatus::Pending, AdStatus::Active, self.clock.now())
            .await?;
        tracing::info!(ad_id = %ad.id, "ad approved");
        Ok(ad)
    }

    #[tracing::instrument(name = "ads.reject", skip(self))]
    pub async fn reject_ad(&self, id: Uuid) -> Result<Ad> {
        let ad = self
            .repo
            .transition_status(id, AdStatus::Pending, AdStatus::Rejected, self.clock.now())
            .await?;
        tracing::info!(ad_id = %ad.id, "ad rejected");
        Ok(ad)
    }

    pub async fn get_ad(&self, id: Uuid) -> Result<Ad> {
        self.repo
            .get_ad(id)
            .await?
            .ok_or_else(|| DomainError::ad_not_found(id))
    }

    fn validate_impression(&self, request: ImpressionRequest) -> Result<NewImpression> {
        let ad_id = require("ad_id", request.ad_id.as_deref())?;
        let ad_id = Uuid::parse_str(ad_id)
            .map_err(|_| DomainError::validation("ad_id must be a UUID"))?;

        let view_type = require("view_type", request.view_type.as_deref())?;
        if view_type.parse::<ViewType>().ok() != Some(ViewType::Replay) {
            return Err(DomainError::validation("view_type must be 'replay'"));
        }

        Ok(NewImpression {
            ad_id,
            viewer_id: non_blank(request.viewer_id),
            session_id: non_blank(request.session_id),
            view_type: ViewType::Replay,
            impression_date: self.clock.now(),
        })
    }
}

fn require<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DomainError::validation(format!("{field} is required"))),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn shuffle(ads: &mut [Ad]) {
    ads.shuffle(&mut rand::rng());
}
