// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Integration tests for the SQLite layer (in-memory database).

use stride_sync::models::{ActivityRecord, ActivitySource};

mod common;
use common::{credential, test_db};

fn record(dedup_key: &str, athlete_id: Option<u64>, distance_km: f64) -> ActivityRecord {
    ActivityRecord {
        dedup_key: dedup_key.to_string(),
        source: ActivitySource::Athlete,
        athlete_id,
        athlete_name: athlete_id.map(|id| format!("Runner {}", id)),
        activity_id: None,
        name: "Morning Run".to_string(),
        sport_type: "Run".to_string(),
        start_date: Some("2026-03-01T07:00:00Z".to_string()),
        start_date_local: Some("2026-03-01T08:00:00Z".to_string()),
        activity_date: Some("2026-03-01".to_string()),
        iso_week: Some("2026-W09".to_string()),
        distance_km,
        moving_time_secs: 3600,
        elapsed_time_secs: 3700,
        elevation_gain_m: 40.0,
        pace: Some("6:00".to_string()),
        photo_url: None,
        fetched_at: "2026-10-14T12:00:00Z".to_string(),
    }
}

#[tokio::test]
async fn test_upsert_same_key_updates_in_place() {
    let db = test_db().await;

    let mut activity = record("id:1001", Some(7), 10.0);
    activity.activity_id = Some(1001);
    let affected = db.upsert_activity(&activity).await.unwrap();
    assert_eq!(affected, 1);
    assert_eq!(db.count_activities().await.unwrap(), 1);

    activity.name = "Renamed Run".to_string();
    activity.pace = Some("5:59".to_string());
    db.upsert_activity(&activity).await.unwrap();

    assert_eq!(db.count_activities().await.unwrap(), 1, "no duplicate row");
    let stored = db.get_activity("id:1001").await.unwrap().unwrap();
    assert_eq!(stored.name, "Renamed Run");
    assert_eq!(stored.pace.as_deref(), Some("5:59"));
    assert_eq!(stored.activity_id, Some(1001));
}

#[tokio::test]
async fn test_upsert_keeps_known_identity_fields() {
    let db = test_db().await;

    let mut activity = record("h:abc", Some(7), 5.0);
    activity.photo_url = Some("https://img/1.jpg".to_string());
    db.upsert_activity(&activity).await.unwrap();

    // Later redacted fetch of the same key.
    activity.athlete_id = None;
    activity.start_date = None;
    activity.activity_date = None;
    activity.photo_url = None;
    db.upsert_activity(&activity).await.unwrap();

    let stored = db.get_activity("h:abc").await.unwrap().unwrap();
    assert_eq!(stored.athlete_id, Some(7));
    assert_eq!(stored.start_date.as_deref(), Some("2026-03-01T07:00:00Z"));
    assert_eq!(stored.activity_date.as_deref(), Some("2026-03-01"));
    assert_eq!(stored.photo_url.as_deref(), Some("https://img/1.jpg"));
}

#[tokio::test]
async fn test_distinct_keys_are_distinct_rows() {
    let db = test_db().await;

    db.upsert_activity(&record("id:1", Some(1), 5.0)).await.unwrap();
    db.upsert_activity(&record("id:2", Some(1), 5.0)).await.unwrap();
    db.upsert_activity(&record("id:1", Some(1), 6.0)).await.unwrap();

    assert_eq!(db.count_activities().await.unwrap(), 2);
}

#[tokio::test]
async fn test_athlete_upsert_and_list() {
    let db = test_db().await;

    db.upsert_athlete(&credential(20, Some(3600))).await.unwrap();
    db.upsert_athlete(&credential(10, None)).await.unwrap();

    let mut updated = credential(20, Some(7200));
    updated.access_token = "new-access".to_string();
    db.upsert_athlete(&updated).await.unwrap();

    let athletes = db.list_athletes().await.unwrap();
    assert_eq!(athletes.len(), 2);
    assert_eq!(athletes[0].athlete_id, 10);
    assert_eq!(athletes[0].expires_at, None);
    assert_eq!(athletes[1].access_token, "new-access");

    assert_eq!(db.get_athlete(20).await.unwrap(), Some(updated));
    assert_eq!(db.get_athlete(99).await.unwrap(), None);
}

#[tokio::test]
async fn test_leaderboard_orders_by_distance() {
    let db = test_db().await;

    db.upsert_activity(&record("id:1", Some(1), 5.0)).await.unwrap();
    db.upsert_activity(&record("id:2", Some(1), 5.0)).await.unwrap();
    db.upsert_activity(&record("id:3", Some(2), 12.0)).await.unwrap();

    let mut club_row = record("h:1", None, 3.0);
    club_row.source = ActivitySource::Club;
    club_row.athlete_name = Some("Jane D.".to_string());
    club_row.activity_date = None;
    db.upsert_activity(&club_row).await.unwrap();

    let board = db.leaderboard(None, None, 10).await.unwrap();
    assert_eq!(board.len(), 3);
    assert_eq!(board[0].athlete_id, Some(2));
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[1].athlete_id, Some(1));
    assert_eq!(board[1].runs, 2);
    assert_eq!(board[1].distance_km, 10.0);
    assert_eq!(board[1].moving_time_secs, 7200);
    assert_eq!(board[2].athlete_name, "Jane D.");
    assert_eq!(board[2].athlete_id, None);

    // Undated club rows drop out once a date window is requested.
    let board = db.leaderboard(Some("2026-01-01"), None, 10).await.unwrap();
    assert_eq!(board.len(), 2);

    let board = db
        .leaderboard(None, Some(ActivitySource::Club), 10)
        .await
        .unwrap();
    assert_eq!(board.len(), 1);

    let board = db.leaderboard(None, None, 1).await.unwrap();
    assert_eq!(board.len(), 1);
}

#[tokio::test]
async fn test_leaderboard_counts_athlete_once_across_feeds() {
    let db = test_db().await;
    db.upsert_athlete(&credential(1, Some(3600))).await.unwrap();

    let mut own = record("id:100", Some(1), 10.0);
    own.activity_id = Some(100);
    db.upsert_activity(&own).await.unwrap();

    // The same run as the club feed reports it, under both name forms.
    for (key, name) in [("h:full", "Runner 1"), ("h:short", "Runner 1.")] {
        let mut seen_in_club = record(key, None, 10.0);
        seen_in_club.source = ActivitySource::Club;
        seen_in_club.athlete_name = Some(name.to_string());
        db.upsert_activity(&seen_in_club).await.unwrap();
    }

    let mut other = record("h:other", None, 4.0);
    other.source = ActivitySource::Club;
    other.athlete_name = Some("Jane D.".to_string());
    db.upsert_activity(&other).await.unwrap();

    assert_eq!(db.count_activities().await.unwrap(), 4);

    let board = db.leaderboard(None, None, 10).await.unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].athlete_id, Some(1));
    assert_eq!(board[0].runs, 1);
    assert_eq!(board[0].distance_km, 10.0);
    assert_eq!(board[1].athlete_name, "Jane D.");

    // An explicit club ranking still shows every club row.
    let club = db
        .leaderboard(None, Some(ActivitySource::Club), 10)
        .await
        .unwrap();
    assert_eq!(club.len(), 3);
}
