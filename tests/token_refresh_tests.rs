// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token lifecycle tests against a mock Strava OAuth endpoint.

use serde_json::json;
use stride_sync::error::AppError;
use stride_sync::services::{StravaClient, StravaService};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{credential, mock_config, test_db};

async fn service(server: &MockServer) -> (StravaService, stride_sync::db::Database) {
    let db = test_db().await;
    let client = StravaClient::from_config(&mock_config(server));
    (StravaService::new(client, db.clone()), db)
}

#[tokio::test]
async fn test_token_near_expiry_is_refreshed_before_use() {
    let server = MockServer::start().await;
    let new_expiry = chrono::Utc::now().timestamp() + 21_600;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": "fresh-access",
            "refresh_token": "fresh-refresh",
            "expires_at": new_expiry,
            "expires_in": 21600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (strava, db) = service(&server).await;
    db.upsert_athlete(&credential(7, Some(30))).await.unwrap();

    let token = strava.get_valid_access_token(7).await.unwrap();
    assert_eq!(token, "fresh-access");

    let stored = db.get_athlete(7).await.unwrap().unwrap();
    assert_eq!(stored.access_token, "fresh-access");
    assert_eq!(stored.refresh_token, "fresh-refresh");
    assert_eq!(stored.expires_at, Some(new_expiry));
    assert_eq!(stored.display_name, "Runner 7");
}

#[tokio::test]
async fn test_valid_token_is_used_without_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (strava, db) = service(&server).await;
    db.upsert_athlete(&credential(8, Some(3600))).await.unwrap();

    let token = strava.get_valid_access_token(8).await.unwrap();
    assert_eq!(token, "access-8");
}

#[tokio::test]
async fn test_missing_expiry_forces_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-access",
            "refresh_token": "refresh-9",
            "expires_at": 4_102_444_800i64
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (strava, db) = service(&server).await;
    db.upsert_athlete(&credential(9, None)).await.unwrap();

    assert_eq!(strava.get_valid_access_token(9).await.unwrap(), "fresh-access");
}

#[tokio::test]
async fn test_refresh_failure_propagates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"message": "Bad Request", "errors": [{"code": "invalid"}]})),
        )
        .mount(&server)
        .await;

    let (strava, db) = service(&server).await;
    db.upsert_athlete(&credential(10, Some(-100))).await.unwrap();

    let err = strava.get_valid_access_token(10).await.unwrap_err();
    assert!(matches!(err, AppError::StravaApi(ref msg) if msg.starts_with("HTTP 400")));

    // Stored credential is untouched.
    let stored = db.get_athlete(10).await.unwrap().unwrap();
    assert_eq!(stored.access_token, "access-10");
}

#[tokio::test]
async fn test_unknown_athlete_is_not_found() {
    let server = MockServer::start().await;
    let (strava, _db) = service(&server).await;

    let err = strava.get_valid_access_token(404).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_oauth_callback_stores_credential() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_at": 1_900_000_000i64,
            "expires_in": 21600,
            "refresh_token": "r-1",
            "access_token": "a-1",
            "athlete": {"id": 555, "firstname": "Ada", "lastname": "Lovelace", "resource_state": 2}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (strava, db) = service(&server).await;
    let result = strava.handle_oauth_callback("auth-code").await.unwrap();

    assert_eq!(result.athlete_id, 555);
    assert_eq!(result.display_name, "Ada Lovelace");

    let stored = db.get_athlete(555).await.unwrap().unwrap();
    assert_eq!(stored.access_token, "a-1");
    assert_eq!(stored.refresh_token, "r-1");
    assert_eq!(stored.expires_at, Some(1_900_000_000));
}
