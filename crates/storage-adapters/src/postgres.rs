//! # Postgres AdRepository
//!
//! This module implements the data mapping between the Postgres relational
//! model and the `domains` models. Every counter mutation is a single
//! `UPDATE ... RETURNING` statement, so concurrent impressions serialize on
//! the row lock instead of racing in application code.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    Ad, AdPolicy, AdRepository, AdStatus, DomainError, Impression, NewImpression,
    RecordedImpression, Result,
};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use uuid::Uuid;

use crate::error::StorageError;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const AD_COLUMNS: &str = "id, room_id, session_id, advertiser_id, title, video_url, status, \
     impressions_count, lobby_impressions, replay_impressions, \
     created_at, updated_at, approved_at, expires_at";

#[derive(Clone)]
pub struct PgAdRepository {
    pool: PgPool,
}

impl PgAdRepository {
    /// Opens a pool against `url`.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> std::result::Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the bundled `ads` / `ad_impressions` migrations.
    pub async fn migrate(&self) -> std::result::Result<(), StorageError> {
        MIGRATOR.run(&self.pool).await?;
        tracing::debug!(migrations = MIGRATOR.iter().count(), "ad schema up to date");
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct AdRow {
    id: Uuid,
    room_id: String,
    session_id: Option<String>,
    advertiser_id: Option<String>,
    title: String,
    video_url: String,
    status: String,
    impressions_count: i64,
    lobby_impressions: i64,
    replay_impressions: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    approved_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<AdRow> for Ad {
    type Error = StorageError;

    fn try_from(row: AdRow) -> std::result::Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<AdStatus>()
            .map_err(|e| StorageError::Decode(format!("ad {}: {e}", row.id)))?;
        Ok(Ad {
            id: row.id,
            room_id: row.room_id,
            session_id: row.session_id,
            advertiser_id: row.advertiser_id,
            title: row.title,
            video_url: row.video_url,
            status,
            impressions_count: row.impressions_count,
            lobby_impressions: row.lobby_impressions,
            replay_impressions: row.replay_impressions,
            created_at: row.created_at,
            updated_at: row.updated_at,
            approved_at: row.approved_at,
            expires_at: row.expires_at,
        })
    }
}

fn into_ads(rows: Vec<AdRow>) -> Result<Vec<Ad>> {
    rows.into_iter()
        .map(|row| Ad::try_from(row).map_err(DomainError::from))
        .collect()
}

fn db_err(err: sqlx::Error) -> DomainError {
    StorageError::from(err).into()
}

#[derive(sqlx::FromRow)]
struct CounterRow {
    impressions_count: i64,
    status: String,
}

#[async_trait]
impl AdRepository for PgAdRepository {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn insert_ad(&self, ad: &Ad) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO ads ({AD_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(ad.id)
        .bind(&ad.room_id)
        .bind(&ad.session_id)
        .bind(&ad.advertiser_id)
        .bind(&ad.title)
        .bind(&ad.video_url)
        .bind(ad.status.as_str())
        .bind(ad.impressions_count)
        .bind(ad.lobby_impressions)
        .bind(ad.replay_impressions)
        .bind(ad.created_at)
        .bind(ad.updated_at)
        .bind(ad.approved_at)
        .bind(ad.expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_ad(&self, id: Uuid) -> Result<Option<Ad>> {
        let row: Option<AdRow> =
            sqlx::query_as(&format!("SELECT {AD_COLUMNS} FROM ads WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        row.map(Ad::try_from)
            .transpose()
            .map_err(DomainError::from)
    }

    async fn list_active_by_room(&self, room_id: &str) -> Result<Vec<Ad>> {
        let rows: Vec<AdRow> = sqlx::query_as(&format!(
            "SELECT {AD_COLUMNS} FROM ads \
             WHERE status = 'active' AND room_id = $1 \
             ORDER BY created_at ASC"
        ))
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        into_ads(rows)
    }

    async fn list_replay_candidates(
        &self,
        room_id: &str,
        policy: AdPolicy,
        now: DateTime<Utc>,
    ) -> Result<Vec<Ad>> {
        let rows: Vec<AdRow> = sqlx::query_as(&format!(
            "SELECT {AD_COLUMNS} FROM ads \
             WHERE status = 'active' AND room_id = $1 \
               AND impressions_count < $2 AND approved_at >= $3 \
             ORDER BY created_at ASC"
        ))
        .bind(room_id)
        .bind(policy.impression_cap)
        .bind(policy.age_cutoff(now))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        into_ads(rows)
    }

    /// Counter bump and impression insert share one transaction.
    ///
    /// # Developer Note
    /// The row is locked with `FOR UPDATE` before the counters move, so the
    /// status read in step 1 is the one the `UPDATE` transitions from and
    /// concurrent impressions for the same ad queue behind it. Every `SET`
    /// expression sees the pre-update row, so `impressions_count + 1` is the
    /// new count in each branch.
    async fn record_impression(
        &self,
        impression: NewImpression,
        policy: AdPolicy,
    ) -> Result<RecordedImpression> {
        let impression = Impression::from_new(impression);
        let now = impression.impression_date;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // 1. Lock the row and remember where it started
        let before: Option<String> =
            sqlx::query_scalar("SELECT status FROM ads WHERE id = $1 FOR UPDATE")
                .bind(impression.ad_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;

        let Some(before) = before else {
            tx.rollback().await.map_err(db_err)?;
            tracing::debug!(ad_id = %impression.ad_id, "impression for unknown ad rolled back");
            return Err(DomainError::ad_not_found(impression.ad_id));
        };

        // 2. Bump counters, expiring the ad once it crosses the cap
        let counters: CounterRow = sqlx::query_as(
            "UPDATE ads SET \
                 impressions_count  = impressions_count + 1, \
                 replay_impressions = impressions_count + 1, \
                 status = CASE WHEN status = 'active' AND impressions_count + 1 >= $2 \
                               THEN 'expired' ELSE status END, \
                 expires_at = CASE WHEN status = 'active' AND impressions_count + 1 >= $2 \
                                   THEN COALESCE(expires_at, $3) ELSE expires_at END, \
                 updated_at = $3 \
             WHERE id = $1 \
             RETURNING impressions_count, status",
        )
        .bind(impression.ad_id)
        .bind(policy.impression_cap)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        // 3. Append to the impression log
        sqlx::query(
            "INSERT INTO ad_impressions (id, ad_id, viewer_id, session_id, view_type, impression_date) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(impression.id)
        .bind(impression.ad_id)
        .bind(&impression.viewer_id)
        .bind(&impression.session_id)
        .bind(impression.view_type.as_str())
        .bind(impression.impression_date)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        let status = counters
            .status
            .parse::<AdStatus>()
            .map_err(|e| DomainError::from(StorageError::Decode(e.to_string())))?;
        Ok(RecordedImpression {
            ad_id: impression.ad_id,
            impressions_count: counters.impressions_count,
            status,
            just_expired: before == AdStatus::Active.as_str() && status == AdStatus::Expired,
        })
    }

    async fn expire_stale(&self, policy: AdPolicy, now: DateTime<Utc>) -> Result<Vec<Ad>> {
        let rows: Vec<AdRow> = sqlx::query_as(&format!(
            "UPDATE ads SET status = 'expired', updated_at = $3, \
                 expires_at = COALESCE(expires_at, $3) \
             WHERE status = 'active' \
               AND (impressions_count >= $1 OR approved_at < $2) \
             RETURNING {AD_COLUMNS}"
        ))
        .bind(policy.impression_cap)
        .bind(policy.age_cutoff(now))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        into_ads(rows)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: AdStatus,
        to: AdStatus,
        now: DateTime<Utc>,
    ) -> Result<Ad> {
        let approved_at = (to == AdStatus::Active).then_some(now);
        let row: Option<AdRow> = sqlx::query_as(&format!(
            "UPDATE ads SET status = $3, updated_at = $4, \
                 approved_at = COALESCE($5, approved_at) \
             WHERE id = $1 AND status = $2 \
             RETURNING {AD_COLUMNS}"
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(now)
        .bind(approved_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        if let Some(row) = row {
            return Ad::try_from(row).map_err(DomainError::from);
        }

        let current: Option<String> = sqlx::query_scalar("SELECT status FROM ads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match current {
            None => Err(DomainError::ad_not_found(id)),
            Some(status) => Err(DomainError::Conflict(format!(
                "ad {id} is {status}, expected {from}"
            ))),
        }
    }
}
