// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Sync trigger route.
//!
//! Called by an external scheduler (cron, Cloud Scheduler). Runs one pass
//! synchronously and reports what was stored.

use crate::error::Result;
use crate::services::{SyncService, SyncSummary};
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/sync", get(trigger_sync).post(trigger_sync))
}

/// Fetch both feeds and upsert. Any fetch failure surfaces as an error response.
async fn trigger_sync(State(state): State<Arc<AppState>>) -> Result<Json<SyncSummary>> {
    let summary = SyncService::from(state.as_ref()).run().await?;
    Ok(Json(summary))
}
