//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be wired into the binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Ad, AdStatus, NewImpression, RecordedImpression};
use crate::policy::AdPolicy;

/// Persistence contract for ads and the impression log.
///
/// # Developer Note
/// Counter mutation belongs to the store: `record_impression` and
/// `expire_stale` must each be atomic, since handler invocations may run on
/// different processes and no application-level lock is held.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AdRepository: Send + Sync {
    /// Cheap round-trip used by health checks.
    async fn ping(&self) -> Result<()>;

    async fn insert_ad(&self, ad: &Ad) -> Result<()>;

    async fn get_ad(&self, id: Uuid) -> Result<Option<Ad>>;

    /// Active ads in a room, oldest first.
    async fn list_active_by_room(&self, room_id: &str) -> Result<Vec<Ad>>;

    /// Active ads in a room under the impression cap and approved inside
    /// the age window.
    async fn list_replay_candidates(
        &self,
        room_id: &str,
        policy: AdPolicy,
        now: DateTime<Utc>,
    ) -> Result<Vec<Ad>>;

    /// Appends the impression and increments the ad's counters as one
    /// unit, expiring the ad once the new count reaches the cap.
    /// Fails with `NotFound` (and writes nothing) for an unknown ad.
    async fn record_impression(
        &self,
        impression: NewImpression,
        policy: AdPolicy,
    ) -> Result<RecordedImpression>;

    /// Moves every active ad past the cap or the age window to `expired`
    /// in one statement and returns the affected rows.
    async fn expire_stale(&self, policy: AdPolicy, now: DateTime<Utc>) -> Result<Vec<Ad>>;

    /// Compare-and-set on `status`. Stamps `approved_at` when moving to
    /// `active`. `NotFound` for an unknown ad, `Conflict` when the current
    /// status is not `from`.
    async fn transition_status(
        &self,
        id: Uuid,
        from: AdStatus,
        to: AdStatus,
        now: DateTime<Utc>,
    ) -> Result<Ad>;
}

/// Source of "now"; swapped for a fixed clock in tests.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Gate for privileged routes (cron sweep, admin review).
pub trait AccessGuard: Send + Sync {
    /// Checks the raw `Authorization` header value, if any.
    fn authorize(&self, authorization: Option<&str>) -> Result<()>;

    /// Whether a secret is configured at all.
    fn is_enforced(&self) -> bool;
}
