// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! stride-sync: club and athlete running feeds from Strava into SQLite.
//!
//! This crate provides the HTTP service that authorizes athletes, pulls
//! their runs on a schedule and keeps a deduplicated activities table.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::StravaService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub strava: StravaService,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Self {
        let client = services::StravaClient::from_config(&config);
        let strava = StravaService::new(client, db.clone());
        Self { config, db, strava }
    }
}
