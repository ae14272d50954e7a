//! # Ad Policy
//!
//! Eligibility and expiry predicates shared by the service layer and the
//! storage adapters. Adapters push the same conditions down into their
//! queries; the service re-checks rows with these functions so that every
//! adapter yields identical results.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Ad, AdStatus};

pub const DEFAULT_IMPRESSION_CAP: i64 = 2000;
pub const DEFAULT_MAX_AGE_DAYS: i64 = 30;

/// Impression cap and age window that bound an ad's `active` life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdPolicy {
    pub impression_cap: i64,
    pub max_age_days: i64,
}

impl Default for AdPolicy {
    fn default() -> Self {
        Self {
            impression_cap: DEFAULT_IMPRESSION_CAP,
            max_age_days: DEFAULT_MAX_AGE_DAYS,
        }
    }
}

impl AdPolicy {
    pub fn new(impression_cap: i64, max_age_days: i64) -> Self {
        Self {
            impression_cap,
            max_age_days,
        }
    }

    /// Oldest `approved_at` still inside the age window. A window wider
    /// than the representable range never ages anything out.
    pub fn age_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        Duration::try_days(self.max_age_days)
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn reached_cap(&self, impressions: i64) -> bool {
        impressions >= self.impression_cap
    }

    /// Lobby rotation admits ads that were never shown, or that already
    /// completed a full rotation. Counters in `1..cap` are held back.
    pub fn is_lobby_eligible(&self, ad: &Ad) -> bool {
        ad.is_active() && (ad.lobby_impressions == 0 || self.reached_cap(ad.lobby_impressions))
    }

    /// Replay pre-roll needs headroom under the cap and an approval inside
    /// the age window. Unapproved ads never qualify.
    pub fn is_replay_eligible(&self, ad: &Ad, now: DateTime<Utc>) -> bool {
        let fresh = ad
            .approved_at
            .is_some_and(|approved| approved >= self.age_cutoff(now));
        ad.is_active() && !self.reached_cap(ad.impressions_count) && fresh
    }

    /// True when the sweep must move this ad to `expired`.
    pub fn should_expire(&self, ad: &Ad, now: DateTime<Utc>) -> bool {
        let aged_out = ad
            .approved_at
            .is_some_and(|approved| approved < self.age_cutoff(now));
        ad.is_active() && (self.reached_cap(ad.impressions_count) || aged_out)
    }

    /// Counter update for one replay impression. Replay and total counters
    /// move together; an active ad crossing the cap expires on the spot.
    pub fn apply_impression(&self, ad: &mut Ad, now: DateTime<Utc>) {
        ad.impressions_count += 1;
        ad.replay_impressions = ad.impressions_count;
        if ad.is_active() && self.reached_cap(ad.impressions_count) {
            ad.status = AdStatus::Expired;
            ad.expires_at.get_or_insert(now);
        }
        ad.updated_at = now;
    }

    /// Moves an ad to `expired`, keeping an earlier `expires_at` if set.
    pub fn expire(&self, ad: &mut Ad, now: DateTime<Utc>) {
        ad.status = AdStatus::Expired;
        ad.expires_at.get_or_insert(now);
        ad.updated_at = now;
    }
}
