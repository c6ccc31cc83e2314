//! Ranking aggregates over stored activities.

use serde::Serialize;

/// One athlete's totals on the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    /// Athlete ID when known, otherwise grouped by display name
    pub athlete_id: Option<u64>,
    pub athlete_name: String,
    pub runs: u32,
    pub distance_km: f64,
    pub moving_time_secs: i64,
    pub elevation_gain_m: f64,
}
