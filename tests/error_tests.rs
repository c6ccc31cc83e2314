// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{http::StatusCode, response::IntoResponse};
use stride_sync::config::ConfigError;
use stride_sync::error::AppError;

#[test]
fn test_is_strava_token_error_matches() {
    let err = AppError::StravaApi(AppError::STRAVA_TOKEN_ERROR.to_string());
    assert!(err.is_strava_token_error());
}

#[test]
fn test_is_strava_token_error_no_match() {
    let err = AppError::StravaApi(AppError::STRAVA_RATE_LIMIT.to_string());
    assert!(!err.is_strava_token_error());

    let err = AppError::StravaApi("HTTP 500 Internal Server Error: oops".to_string());
    assert!(!err.is_strava_token_error());

    let err = AppError::BadRequest("Bad Request".to_string());
    assert!(!err.is_strava_token_error());
}

#[tokio::test]
async fn test_error_response_carries_message() {
    let response = AppError::StravaApi("HTTP 503: down".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "strava_error");
    assert_eq!(json["details"], "HTTP 503: down");
}

#[test]
fn test_error_status_codes() {
    let cases = [
        (AppError::Forbidden, StatusCode::FORBIDDEN),
        (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
        (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
        (AppError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (
            AppError::Config(ConfigError::Missing("STRAVA_CLIENT_ID")),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (err, status) in cases {
        assert_eq!(err.into_response().status(), status);
    }
}
