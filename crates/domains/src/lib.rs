//! kaboom-ads/crates/domains/src/lib.rs
//!
//! The central domain model, expiry policy and port definitions for the
//! ad lifecycle engine.

pub mod error;
pub mod models;
pub mod policy;
pub mod ports;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use policy::*;
pub use ports::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use chrono::Utc;

    #[test]
    fn submitted_ad_starts_pending_with_zero_counters() {
        let ad = Ad::submitted(
            NewAd {
                room_id: "room-9".into(),
                session_id: Some("s-1".into()),
                advertiser_id: None,
                title: "Launch".into(),
                video_url: "https://cdn.example/launch.mp4".into(),
            },
            Utc::now(),
        );
        assert_eq!(ad.status, AdStatus::Pending);
        assert_eq!(ad.impressions_count, 0);
        assert_eq!(ad.lobby_impressions, 0);
        assert_eq!(ad.replay_impressions, 0);
        assert!(ad.approved_at.is_none());
        assert_eq!(ad.id.get_version_num(), 7);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_value(AdStatus::Expired).unwrap();
        assert_eq!(json, serde_json::json!("expired"));
        assert_eq!("active".parse::<AdStatus>().unwrap(), AdStatus::Active);
        assert!("archived".parse::<AdStatus>().is_err());
    }

    #[test]
    fn view_type_parses_known_placements_only() {
        assert_eq!("replay".parse::<ViewType>().unwrap(), ViewType::Replay);
        assert_eq!("lobby".parse::<ViewType>().unwrap(), ViewType::Lobby);
        assert!("REPLAY".parse::<ViewType>().is_err());
    }
}
