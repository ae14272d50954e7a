//! Lobby and replay placement behaviour observed over HTTP.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{active_ad, TestApp};
use domains::{AdPolicy, AdStatus, MockClock};

#[tokio::test]
async fn lobby_includes_fresh_and_saturated_ads_but_not_midway() {
    let app = TestApp::new();
    let now = Utc::now();

    let a = active_ad("room", now, 1);
    let mut b = active_ad("room", now, 1);
    b.lobby_impressions = 1500;
    let mut c = active_ad("room", now, 1);
    c.lobby_impressions = 2100;
    for ad in [&a, &b, &c] {
        app.repo.put(ad.clone());
    }

    let mut listed = app.lobby("room").await;
    listed.sort();
    let mut expected = vec![a.id, c.id];
    expected.sort();
    assert_eq!(listed, expected);
}

#[tokio::test]
async fn lobby_is_scoped_to_room_and_status() {
    let app = TestApp::new();
    let now = Utc::now();

    let mine = active_ad("room", now, 1);
    let other_room = active_ad("elsewhere", now, 1);
    let mut pending = active_ad("room", now, 1);
    pending.status = AdStatus::Pending;
    let mut expired = active_ad("room", now, 1);
    expired.status = AdStatus::Expired;
    for ad in [&mine, &other_room, &pending, &expired] {
        app.repo.put(ad.clone());
    }

    assert_eq!(app.lobby("room").await, vec![mine.id]);
}

#[tokio::test]
async fn lobby_filter_is_stable_between_calls() {
    let app = TestApp::new();
    let now = Utc::now();
    for lobby in [0, 10, 1999, 2000, 5000] {
        let mut ad = active_ad("room", now, 2);
        ad.lobby_impressions = lobby;
        app.repo.put(ad);
    }

    let mut first = app.lobby("room").await;
    let mut second = app.lobby("room").await;
    first.sort();
    second.sort();
    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[tokio::test]
async fn replay_ad_one_short_of_cap_expires_on_next_impression() {
    let app = TestApp::new();
    let mut d = active_ad("room", Utc::now(), 5);
    d.impressions_count = 1999;
    app.repo.put(d.clone());

    assert_eq!(app.replay("room").await, Some(d.id));
    assert_eq!(app.impression(d.id, "replay").await, StatusCode::OK);

    let after = app.repo.snapshot(d.id).unwrap();
    assert_eq!(after.impressions_count, 2000);
    assert_eq!(after.status, AdStatus::Expired);
    assert!(after.expires_at.is_some());
    assert_eq!(app.replay("room").await, None);
    assert_eq!(app.metrics.ads_expired.get(), 1);
}

#[tokio::test]
async fn aged_out_ad_reaching_cap_later_counts_as_one_expiry() {
    let app = TestApp::with_policy(AdPolicy::new(5, 30));
    let mut aged = active_ad("room", Utc::now(), 31);
    aged.impressions_count = 4;
    app.repo.put(aged.clone());

    assert_eq!(app.sweep().await["expired"], 1);
    assert_eq!(app.impression(aged.id, "replay").await, StatusCode::OK);

    let after = app.repo.snapshot(aged.id).unwrap();
    assert_eq!(after.impressions_count, 5);
    assert_eq!(after.status, AdStatus::Expired);
    assert_eq!(app.metrics.ads_expired.get(), 1);
}

#[tokio::test]
async fn replay_skips_aged_ad_and_sweep_expires_it() {
    let app = TestApp::new();
    let mut e = active_ad("room", Utc::now(), 31);
    e.impressions_count = 10;
    app.repo.put(e.clone());

    assert_eq!(app.replay("room").await, None);
    // Still in the lobby until the sweep runs.
    assert_eq!(app.lobby("room").await, vec![e.id]);

    let report = app.sweep().await;
    assert_eq!(report["expired"], 1);
    assert_eq!(app.repo.snapshot(e.id).unwrap().status, AdStatus::Expired);
    assert!(app.lobby("room").await.is_empty());
}

#[tokio::test]
async fn lobby_view_type_impression_is_rejected_with_nothing_written() {
    let app = TestApp::new();
    let ad = active_ad("room", Utc::now(), 1);
    app.repo.put(ad.clone());

    assert_eq!(app.impression(ad.id, "lobby").await, StatusCode::BAD_REQUEST);
    assert_eq!(app.repo.impression_total(), 0);
    assert_eq!(app.repo.snapshot(ad.id).unwrap(), ad);
}

#[tokio::test]
async fn replay_never_offers_capped_or_aged_ads() {
    let now = Utc::now();
    // Requests are served one second after the fixtures were approved, so
    // an approval exactly 30 days back sits just outside the window.
    let mut clock = MockClock::new();
    clock.expect_now().return_const(now + Duration::seconds(1));
    let app = TestApp::with_clock(Arc::new(clock));

    let mut capped = active_ad("room", now, 1);
    capped.impressions_count = 2000;
    let aged = active_ad("room", now, 30);
    let mut unapproved = active_ad("room", now, 1);
    unapproved.approved_at = None;
    for ad in [&capped, &aged, &unapproved] {
        app.repo.put(ad.clone());
    }

    for _ in 0..10 {
        assert_eq!(app.replay("room").await, None);
    }

    let ok = active_ad("room", now, 29);
    app.repo.put(ok.clone());
    for _ in 0..10 {
        assert_eq!(app.replay("room").await, Some(ok.id));
    }
}
