//! # Domain Models
//!
//! These structs represent the core entities of the ad engine.
//! New rows use UUID v7 for time-ordered, globally unique identification.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Lifecycle state of an [`Ad`].
///
/// `pending -> active -> expired`, or `pending -> rejected`.
/// `expired` and `rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdStatus {
    Pending,
    Active,
    Rejected,
    Expired,
}

impl AdStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for AdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            other => Err(DomainError::validation(format!("unknown ad status '{other}'"))),
        }
    }
}

/// An advertiser's video creative bound to a collaboration room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ad {
    pub id: Uuid,
    pub room_id: String,
    pub session_id: Option<String>,
    pub advertiser_id: Option<String>,
    pub title: String,
    pub video_url: String,
    pub status: AdStatus,
    /// Total impressions across placements
    pub impressions_count: i64,
    pub lobby_impressions: i64,
    pub replay_impressions: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when an admin approves the ad; anchors the age window
    pub approved_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Ad {
    /// Builds a freshly submitted ad: `pending`, zero counters.
    pub fn submitted(new: NewAd, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            room_id: new.room_id,
            session_id: new.session_id,
            advertiser_id: new.advertiser_id,
            title: new.title,
            video_url: new.video_url,
            status: AdStatus::Pending,
            impressions_count: 0,
            lobby_impressions: 0,
            replay_impressions: 0,
            created_at: now,
            updated_at: now,
            approved_at: None,
            expires_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AdStatus::Active
    }
}

/// Advertiser submission payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAd {
    pub room_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub advertiser_id: Option<String>,
    pub title: String,
    pub video_url: String,
}

/// Where an ad was shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    Lobby,
    Replay,
}

impl ViewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Replay => "replay",
        }
    }
}

impl FromStr for ViewType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lobby" => Ok(Self::Lobby),
            "replay" => Ok(Self::Replay),
            other => Err(DomainError::validation(format!("unknown view_type '{other}'"))),
        }
    }
}

/// A validated impression, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewImpression {
    pub ad_id: Uuid,
    pub viewer_id: Option<String>,
    pub session_id: Option<String>,
    pub view_type: ViewType,
    pub impression_date: DateTime<Utc>,
}

/// One row of the append-only impression log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Impression {
    pub id: Uuid,
    pub ad_id: Uuid,
    pub viewer_id: Option<String>,
    pub session_id: Option<String>,
    pub view_type: ViewType,
    pub impression_date: DateTime<Utc>,
}

impl Impression {
    pub fn from_new(new: NewImpression) -> Self {
        Self {
            id: Uuid::now_v7(),
            ad_id: new.ad_id,
            viewer_id: new.viewer_id,
            session_id: new.session_id,
            view_type: new.view_type,
            impression_date: new.impression_date,
        }
    }
}

/// What the store reports back after an impression was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedImpression {
    pub ad_id: Uuid,
    pub impressions_count: i64,
    pub status: AdStatus,
    /// This impression moved the ad from `active` to `expired`.
    pub just_expired: bool,
}

impl RecordedImpression {
    pub fn expired(&self) -> bool {
        self.status == AdStatus::Expired
    }
}
