// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Normalized activity row.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which feed an activity row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivitySource {
    /// `GET /clubs/{id}/activities`, often redacted
    Club,
    /// `GET /athlete/activities` with the athlete's own token
    Athlete,
}

impl ActivitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivitySource::Club => "club",
            ActivitySource::Athlete => "athlete",
        }
    }
}

impl fmt::Display for ActivitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivitySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "club" => Ok(ActivitySource::Club),
            "athlete" => Ok(ActivitySource::Athlete),
            other => Err(format!("unknown activity source: {}", other)),
        }
    }
}

/// Stored activity record, one row per dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Unique key (see `services::normalize::dedup_key`)
    pub dedup_key: String,
    pub source: ActivitySource,
    /// Strava athlete ID, unknown for club feed rows
    pub athlete_id: Option<u64>,
    /// Display name ("Jane D." in the club feed)
    pub athlete_name: Option<String>,
    /// Strava activity ID, withheld in the club feed
    pub activity_id: Option<u64>,
    pub name: String,
    /// Sport type (Run, TrailRun, VirtualRun)
    pub sport_type: String,
    /// Start time (UTC, RFC3339)
    pub start_date: Option<String>,
    /// Start time in the athlete's timezone, as Strava reports it
    pub start_date_local: Option<String>,
    /// Local calendar date (YYYY-MM-DD)
    pub activity_date: Option<String>,
    /// ISO week of `activity_date` (YYYY-Www)
    pub iso_week: Option<String>,
    pub distance_km: f64,
    pub moving_time_secs: i64,
    pub elapsed_time_secs: i64,
    pub elevation_gain_m: f64,
    /// Pace per km rendered as m:ss
    pub pace: Option<String>,
    pub photo_url: Option<String>,
    /// When this row was last written
    pub fetched_at: String,
}
