// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::Utc;
use std::sync::Arc;
use stride_sync::config::Config;
use stride_sync::db::Database;
use stride_sync::models::AthleteCredential;
use stride_sync::routes::create_router;
use stride_sync::AppState;
use wiremock::MockServer;

/// Create a fresh in-memory database.
#[allow(dead_code)]
pub async fn test_db() -> Database {
    Database::in_memory()
        .await
        .expect("Failed to open in-memory database")
}

/// Test config pointed at a mock Strava server.
#[allow(dead_code)]
pub fn mock_config(server: &MockServer) -> Config {
    let mut config = Config::test_default();
    config.strava_api_base = format!("{}/api/v3", server.uri());
    config.strava_oauth_base = format!("{}/oauth", server.uri());
    config
}

/// Build state and router around the given config.
#[allow(dead_code)]
pub async fn create_test_app_with(config: Config) -> (axum::Router, Arc<AppState>) {
    let db = test_db().await;
    let state = Arc::new(AppState::new(config, db));
    (create_router(state.clone()), state)
}

/// Test app against production Strava URLs (no outbound calls expected).
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Config::test_default()).await
}

/// Credential whose access token expires `expires_in` seconds from now.
#[allow(dead_code)]
pub fn credential(athlete_id: u64, expires_in: Option<i64>) -> AthleteCredential {
    AthleteCredential {
        athlete_id,
        display_name: format!("Runner {}", athlete_id),
        access_token: format!("access-{}", athlete_id),
        refresh_token: format!("refresh-{}", athlete_id),
        expires_at: expires_in.map(|secs| Utc::now().timestamp() + secs),
        updated_at: "2026-01-01T00:00:00Z".to_string(),
    }
}
