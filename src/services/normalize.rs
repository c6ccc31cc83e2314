// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Raw Strava activity → flat `ActivityRecord`.
//!
//! Handles:
//! - Running-only filtering
//! - Start-date cutoff
//! - Pace rendering
//! - Dedup key derivation for full and redacted payloads

use crate::models::{ActivityRecord, ActivitySource};
use crate::services::strava::StravaActivitySummary;
use crate::time_utils::{calendar_date, format_utc_rfc3339, iso_week_label, parse_utc};
use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// Sport types kept by the sync.
pub const RUNNING_SPORT_TYPES: &[&str] = &["Run", "TrailRun", "VirtualRun"];

/// Hex characters kept from the name/distance/duration digest.
const HASH_KEY_LEN: usize = 16;

/// Who and where a batch of raw activities came from.
#[derive(Debug, Clone)]
pub struct FeedContext {
    pub source: ActivitySource,
    /// Owner of the token for athlete feeds; `None` for the club feed.
    pub athlete_id: Option<u64>,
    pub athlete_name: Option<String>,
    pub cutoff: NaiveDate,
    pub fetched_at: String,
}

/// True for Run / TrailRun / VirtualRun. `sport_type` wins over legacy `type`.
pub fn is_running(activity: &StravaActivitySummary) -> bool {
    activity
        .sport_type
        .as_deref()
        .or(activity.activity_type.as_deref())
        .is_some_and(|sport| RUNNING_SPORT_TYPES.contains(&sport))
}

/// Pace per kilometer as `m:ss`, rounded to the nearest second.
pub fn format_pace(moving_time_secs: i64, distance_km: f64) -> Option<String> {
    if moving_time_secs <= 0 || !distance_km.is_finite() || distance_km <= 0.0 {
        return None;
    }
    let secs_per_km = (moving_time_secs as f64 / distance_km).round() as i64;
    Some(format!("{}:{:02}", secs_per_km / 60, secs_per_km % 60))
}

/// Whether an activity's date falls before the cutoff. Undated activities
/// are never considered before it.
pub fn is_before_cutoff(date: Option<NaiveDate>, cutoff: NaiveDate) -> bool {
    date.is_some_and(|d| d < cutoff)
}

/// Stable key for an activity.
///
/// - `id:{activity_id}` when Strava exposes the ID
/// - `fb:{athlete}:{start_date}:{meters}:{moving_time}` when only the date is known
/// - `h:{digest}`, truncated SHA-256 over name, meters and moving time, when both are withheld
pub fn dedup_key(
    activity_id: Option<u64>,
    athlete: Option<&str>,
    start_date: Option<&str>,
    distance_m: f64,
    moving_time_secs: i64,
    name: &str,
) -> String {
    let meters = distance_m.round() as i64;

    if let Some(id) = activity_id {
        return format!("id:{}", id);
    }

    if let Some(start_date) = start_date {
        return format!(
            "fb:{}:{}:{}:{}",
            athlete.unwrap_or("unknown"),
            start_date,
            meters,
            moving_time_secs
        );
    }

    let digest = Sha256::digest(format!("{}|{}|{}", name.trim(), meters, moving_time_secs));
    let mut hex = hex::encode(digest);
    hex.truncate(HASH_KEY_LEN);
    format!("h:{}", hex)
}

/// Map a raw activity to a record, or `None` if it is filtered out
/// (not a run, or before the cutoff).
pub fn normalize(raw: &StravaActivitySummary, ctx: &FeedContext) -> Option<ActivityRecord> {
    if !is_running(raw) {
        return None;
    }

    let start_date = raw.start_date.as_deref().map(|s| {
        parse_utc(s)
            .map(format_utc_rfc3339)
            .unwrap_or_else(|| s.to_string())
    });
    let local_date = raw
        .start_date_local
        .as_deref()
        .or(raw.start_date.as_deref())
        .and_then(calendar_date);

    if is_before_cutoff(local_date, ctx.cutoff) {
        return None;
    }

    let embedded = raw.athlete.as_ref();
    let athlete_id = ctx.athlete_id.or_else(|| embedded.and_then(|a| a.id));
    let athlete_name = ctx
        .athlete_name
        .clone()
        .or_else(|| embedded.and_then(|a| a.display_name()));

    let name = raw.name.clone().unwrap_or_default();
    let distance_m = raw.distance.unwrap_or(0.0);
    let distance_km = distance_m / 1000.0;
    let moving_time_secs = raw.moving_time.unwrap_or(0);

    let athlete_label = athlete_id.map(|id| id.to_string()).or(athlete_name.clone());
    let key = dedup_key(
        raw.id,
        athlete_label.as_deref(),
        start_date.as_deref(),
        distance_m,
        moving_time_secs,
        &name,
    );

    Some(ActivityRecord {
        dedup_key: key,
        source: ctx.source,
        athlete_id,
        athlete_name,
        activity_id: raw.id,
        name,
        sport_type: raw
            .sport_type
            .clone()
            .or_else(|| raw.activity_type.clone())
            .unwrap_or_default(),
        start_date,
        start_date_local: raw.start_date_local.clone(),
        activity_date: local_date.map(|d| d.format("%Y-%m-%d").to_string()),
        iso_week: local_date.map(iso_week_label),
        distance_km,
        moving_time_secs,
        elapsed_time_secs: raw.elapsed_time.unwrap_or(moving_time_secs),
        elevation_gain_m: raw.total_elevation_gain.unwrap_or(0.0),
        pace: format_pace(moving_time_secs, distance_km),
        photo_url: raw.photo_url().map(str::to_string),
        fetched_at: ctx.fetched_at.clone(),
    })
}
