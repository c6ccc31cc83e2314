// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only reporting routes.

use crate::error::{AppError, Result};
use crate::models::{ActivitySource, LeaderboardEntry};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/leaderboard", get(get_leaderboard))
}

#[derive(Deserialize)]
pub struct LeaderboardParams {
    /// Only count runs on or after this date (YYYY-MM-DD)
    since: Option<String>,
    /// `club` or `athlete`
    source: Option<String>,
    limit: Option<u32>,
}

#[derive(Serialize)]
pub struct LeaderboardResponse {
    pub since: Option<String>,
    pub entries: Vec<LeaderboardEntry>,
}

/// Rank athletes by total distance.
async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<LeaderboardResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    let since = params
        .since
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map(|d| d.format("%Y-%m-%d").to_string())
                .map_err(|_| AppError::BadRequest("since must be YYYY-MM-DD".to_string()))
        })
        .transpose()?;

    let source = params
        .source
        .map(|raw| raw.parse::<ActivitySource>().map_err(AppError::BadRequest))
        .transpose()?;

    let entries = state
        .db
        .leaderboard(since.as_deref(), source, limit)
        .await?;

    Ok(Json(LeaderboardResponse { since, entries }))
}
