//! # In-memory AdRepository
//!
//! A `DashMap`-backed store used by tests and by the binary's `memory`
//! backend. Holding the ad's map entry for the whole impression write makes
//! the insert-and-increment unit atomic per ad.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use domains::{
    Ad, AdPolicy, AdRepository, AdStatus, DomainError, Impression, NewImpression,
    RecordedImpression, Result,
};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryAdRepository {
    ads: DashMap<Uuid, Ad>,
    impressions: DashMap<Uuid, Vec<Impression>>,
}

impl MemoryAdRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an ad as-is, bypassing the lifecycle.
    pub fn put(&self, ad: Ad) {
        self.ads.insert(ad.id, ad);
    }

    pub fn snapshot(&self, id: Uuid) -> Option<Ad> {
        self.ads.get(&id).map(|ad| ad.clone())
    }

    pub fn impressions_for(&self, ad_id: Uuid) -> Vec<Impression> {
        self.impressions
            .get(&ad_id)
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn impression_total(&self) -> usize {
        self.impressions.iter().map(|log| log.len()).sum()
    }

    fn sorted(mut ads: Vec<Ad>) -> Vec<Ad> {
        ads.sort_by_key(|ad| ad.created_at);
        ads
    }
}

#[async_trait]
impl AdRepository for MemoryAdRepository {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_ad(&self, ad: &Ad) -> Result<()> {
        if self.ads.contains_key(&ad.id) {
            return Err(DomainError::Conflict(format!("ad {} already exists", ad.id)));
        }
        self.ads.insert(ad.id, ad.clone());
        Ok(())
    }

    async fn get_ad(&self, id: Uuid) -> Result<Option<Ad>> {
        Ok(self.snapshot(id))
    }

    async fn list_active_by_room(&self, room_id: &str) -> Result<Vec<Ad>> {
        let ads = self
            .ads
            .iter()
            .filter(|ad| ad.is_active() && ad.room_id == room_id)
            .map(|ad| ad.clone())
            .collect();
        Ok(Self::sorted(ads))
    }

    async fn list_replay_candidates(
        &self,
        room_id: &str,
        policy: AdPolicy,
        now: DateTime<Utc>,
    ) -> Result<Vec<Ad>> {
        let ads = self
            .ads
            .iter()
            .filter(|ad| ad.room_id == room_id && policy.is_replay_eligible(ad, now))
            .map(|ad| ad.clone())
            .collect();
        Ok(Self::sorted(ads))
    }

    async fn record_impression(
        &self,
        impression: NewImpression,
        policy: AdPolicy,
    ) -> Result<RecordedImpression> {
        // The entry guard is held until the end of this call.
        let mut ad = self
            .ads
            .get_mut(&impression.ad_id)
            .ok_or_else(|| DomainError::ad_not_found(impression.ad_id))?;

        let now = impression.impression_date;
        self.impressions
            .entry(impression.ad_id)
            .or_default()
            .push(Impression::from_new(impression));
        let was_active = ad.is_active();
        policy.apply_impression(&mut ad, now);

        Ok(RecordedImpression {
            ad_id: ad.id,
            impressions_count: ad.impressions_count,
            status: ad.status,
            just_expired: was_active && ad.status == AdStatus::Expired,
        })
    }

    async fn expire_stale(&self, policy: AdPolicy, now: DateTime<Utc>) -> Result<Vec<Ad>> {
        let mut expired = Vec::new();
        for mut ad in self.ads.iter_mut() {
            if policy.should_expire(&ad, now) {
                policy.expire(&mut ad, now);
                expired.push(ad.clone());
            }
        }
        Ok(Self::sorted(expired))
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: AdStatus,
        to: AdStatus,
        now: DateTime<Utc>,
    ) -> Result<Ad> {
        let mut ad = self
            .ads
            .get_mut(&id)
            .ok_or_else(|| DomainError::ad_not_found(id))?;

        if ad.status != from {
            return Err(DomainError::Conflict(format!(
                "ad {id} is {}, expected {from}",
                ad.status
            )));
        }

        ad.status = to;
        ad.updated_at = now;
        if to == AdStatus::Active {
            ad.approved_at = Some(now);
        }
        Ok(ad.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domains::{NewAd, ViewType};
    use std::sync::Arc;

    fn ad(room: &str, created_at: DateTime<Utc>) -> Ad {
        Ad::submitted(
            NewAd {
                room_id: room.into(),
                session_id: None,
                advertiser_id: None,
                title: "Spot".into(),
                video_url: "https://cdn.example/spot.mp4".into(),
            },
            created_at,
        )
    }

    fn active(room: &str, now: DateTime<Utc>) -> Ad {
        let mut ad = ad(room, now);
        ad.status = AdStatus::Active;
        ad.approved_at = Some(now);
        ad
    }

    fn replay_impression(ad_id: Uuid) -> NewImpression {
        NewImpression {
            ad_id,
            viewer_id: None,
            session_id: None,
            view_type: ViewType::Replay,
            impression_date: Utc::now(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_impressions_are_never_lost() {
        let repo = Arc::new(MemoryAdRepository::new());
        let ad = active("room-1", Utc::now());
        let ad_id = ad.id;
        repo.put(ad);

        let mut handles = Vec::new();
        for _ in 0..200 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.record_impression(replay_impression(ad_id), AdPolicy::default())
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = repo.snapshot(ad_id).unwrap();
        assert_eq!(stored.impressions_count, 200);
        assert_eq!(stored.replay_impressions, 200);
        assert_eq!(repo.impressions_for(ad_id).len(), 200);
    }

    #[tokio::test]
    async fn only_the_capping_impression_reports_the_transition() {
        let repo = MemoryAdRepository::new();
        let policy = AdPolicy::new(3, 30);
        let mut ad = active("room-1", Utc::now());
        ad.impressions_count = 1;
        let ad_id = ad.id;
        repo.put(ad);

        let below = repo.record_impression(replay_impression(ad_id), policy).await.unwrap();
        assert!(!below.just_expired);
        let capping = repo.record_impression(replay_impression(ad_id), policy).await.unwrap();
        assert!(capping.just_expired);
        let past = repo.record_impression(replay_impression(ad_id), policy).await.unwrap();
        assert!(past.expired());
        assert!(!past.just_expired);
    }

    #[tokio::test]
    async fn impression_reaching_cap_on_aged_out_ad_is_not_a_transition() {
        let repo = MemoryAdRepository::new();
        let policy = AdPolicy::new(5, 30);
        let now = Utc::now();
        let mut aged = active("room-1", now);
        aged.approved_at = Some(now - Duration::days(31));
        aged.impressions_count = 4;
        let ad_id = aged.id;
        repo.put(aged);

        assert_eq!(repo.expire_stale(policy, now).await.unwrap().len(), 1);

        let recorded = repo.record_impression(replay_impression(ad_id), policy).await.unwrap();
        assert_eq!(recorded.impressions_count, 5);
        assert!(recorded.expired());
        assert!(!recorded.just_expired);
    }

    #[tokio::test]
    async fn unknown_ad_impression_writes_nothing() {
        let repo = MemoryAdRepository::new();
        let err = repo
            .record_impression(replay_impression(Uuid::now_v7()), AdPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_, _)));
        assert_eq!(repo.impression_total(), 0);
    }

    #[tokio::test]
    async fn active_by_room_is_oldest_first() {
        let repo = MemoryAdRepository::new();
        let now = Utc::now();
        let newer = active("room-1", now);
        let older = active("room-1", now - Duration::hours(1));
        let other_room = active("room-2", now);
        let mut pending = ad("room-1", now);
        pending.status = AdStatus::Pending;
        for a in [newer.clone(), older.clone(), other_room, pending] {
            repo.put(a);
        }

        let ids: Vec<Uuid> = repo
            .list_active_by_room("room-1")
            .await
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![older.id, newer.id]);
    }

    #[tokio::test]
    async fn expire_stale_is_idempotent() {
        let repo = MemoryAdRepository::new();
        let now = Utc::now();
        let mut capped = active("room-1", now);
        capped.impressions_count = 2000;
        let mut aged = active("room-1", now);
        aged.approved_at = Some(now - Duration::days(31));
        let fresh = active("room-1", now);
        for a in [capped.clone(), aged.clone(), fresh.clone()] {
            repo.put(a);
        }

        let first = repo.expire_stale(AdPolicy::default(), now).await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|a| a.status == AdStatus::Expired));
        assert!(repo.snapshot(fresh.id).unwrap().is_active());

        let second = repo.expire_stale(AdPolicy::default(), now).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn transition_requires_expected_status() {
        let repo = MemoryAdRepository::new();
        let now = Utc::now();
        let pending = ad("room-1", now);
        let id = pending.id;
        repo.put(pending);

        let approved = repo
            .transition_status(id, AdStatus::Pending, AdStatus::Active, now)
            .await
            .unwrap();
        assert_eq!(approved.approved_at, Some(now));

        let err = repo
            .transition_status(id, AdStatus::Pending, AdStatus::Rejected, now)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
