// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Athletes (OAuth credentials)
//! - Activities (normalized, deduplicated rows)
//! - Leaderboard aggregates

use crate::error::AppError;
use crate::models::{ActivityRecord, ActivitySource, AthleteCredential, LeaderboardEntry};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

/// Pool size for file-backed databases.
const MAX_CONNECTIONS: u32 = 5;

/// SQLite database client.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a pool and run embedded migrations.
    ///
    /// In-memory databases exist per connection, so they get exactly one
    /// connection that is never recycled.
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let in_memory = url.contains(":memory:");

        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        };

        let pool = options
            .connect(url)
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!(in_memory, "Connected to SQLite");

        Ok(Self { pool })
    }

    /// Fresh in-memory database (tests, local experiments).
    pub async fn in_memory() -> Result<Self, AppError> {
        Self::connect("sqlite::memory:").await
    }

    /// Underlying pool, for ad-hoc queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ─── Athlete Operations ──────────────────────────────────────

    /// Create or replace an athlete's credentials.
    pub async fn upsert_athlete(&self, athlete: &AthleteCredential) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO athletes
                (athlete_id, display_name, access_token, refresh_token, expires_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(athlete_id) DO UPDATE SET
                display_name = excluded.display_name,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(athlete.athlete_id as i64)
        .bind(&athlete.display_name)
        .bind(&athlete.access_token)
        .bind(&athlete.refresh_token)
        .bind(athlete.expires_at)
        .bind(&athlete.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get credentials for one athlete.
    pub async fn get_athlete(&self, athlete_id: u64) -> Result<Option<AthleteCredential>, AppError> {
        let row = sqlx::query("SELECT * FROM athletes WHERE athlete_id = ?1")
            .bind(athlete_id as i64)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_athlete).transpose()
    }

    /// All authorized athletes, ordered by ID.
    pub async fn list_athletes(&self) -> Result<Vec<AthleteCredential>, AppError> {
        let rows = sqlx::query("SELECT * FROM athletes ORDER BY athlete_id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_athlete).collect()
    }

    // ─── Activity Operations ─────────────────────────────────────

    /// Insert or update an activity by dedup key. Returns rows affected.
    ///
    /// Display fields are overwritten. Identity fields already known are
    /// kept when a later (redacted) fetch of the same key lacks them.
    pub async fn upsert_activity(&self, activity: &ActivityRecord) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO activities (
                dedup_key, source, athlete_id, athlete_name, activity_id, name, sport_type,
                start_date, start_date_local, activity_date, iso_week,
                distance_km, moving_time_secs, elapsed_time_secs, elevation_gain_m,
                pace, photo_url, fetched_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            ON CONFLICT(dedup_key) DO UPDATE SET
                source = excluded.source,
                athlete_id = COALESCE(excluded.athlete_id, activities.athlete_id),
                athlete_name = COALESCE(excluded.athlete_name, activities.athlete_name),
                activity_id = COALESCE(excluded.activity_id, activities.activity_id),
                name = excluded.name,
                sport_type = excluded.sport_type,
                start_date = COALESCE(excluded.start_date, activities.start_date),
                start_date_local = COALESCE(excluded.start_date_local, activities.start_date_local),
                activity_date = COALESCE(excluded.activity_date, activities.activity_date),
                iso_week = COALESCE(excluded.iso_week, activities.iso_week),
                distance_km = excluded.distance_km,
                moving_time_secs = excluded.moving_time_secs,
                elapsed_time_secs = excluded.elapsed_time_secs,
                elevation_gain_m = excluded.elevation_gain_m,
                pace = excluded.pace,
                photo_url = COALESCE(excluded.photo_url, activities.photo_url),
                fetched_at = excluded.fetched_at
            "#,
        )
        .bind(&activity.dedup_key)
        .bind(activity.source.as_str())
        .bind(activity.athlete_id.map(|id| id as i64))
        .bind(&activity.athlete_name)
        .bind(activity.activity_id.map(|id| id as i64))
        .bind(&activity.name)
        .bind(&activity.sport_type)
        .bind(&activity.start_date)
        .bind(&activity.start_date_local)
        .bind(&activity.activity_date)
        .bind(&activity.iso_week)
        .bind(activity.distance_km)
        .bind(activity.moving_time_secs)
        .bind(activity.elapsed_time_secs)
        .bind(activity.elevation_gain_m)
        .bind(&activity.pace)
        .bind(&activity.photo_url)
        .bind(&activity.fetched_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Get one activity by dedup key.
    pub async fn get_activity(&self, dedup_key: &str) -> Result<Option<ActivityRecord>, AppError> {
        let row = sqlx::query("SELECT * FROM activities WHERE dedup_key = ?1")
            .bind(dedup_key)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_activity).transpose()
    }

    /// Total number of stored activities.
    pub async fn count_activities(&self) -> Result<u64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activities")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    // ─── Leaderboard ─────────────────────────────────────────────

    /// Per-athlete totals ordered by distance.
    ///
    /// Rows without an athlete ID (club feed) are grouped by display name.
    /// With `since` set, undated rows are left out.
    ///
    /// Without a `source` filter, club rows naming a stored athlete are left
    /// out, since that athlete's own feed already carries the same runs. The
    /// club feed shows names as `First L.`, so both that form and the full
    /// display name match.
    pub async fn leaderboard(
        &self,
        since: Option<&str>,
        source: Option<ActivitySource>,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT
                MAX(athlete_id) AS athlete_id,
                COALESCE(MAX(athlete_name), 'Unknown') AS athlete_name,
                COUNT(*) AS runs,
                SUM(distance_km) AS distance_km,
                SUM(moving_time_secs) AS moving_time_secs,
                SUM(elevation_gain_m) AS elevation_gain_m
            FROM activities
            WHERE (?1 IS NULL OR activity_date >= ?1)
              AND (?2 IS NULL OR source = ?2)
              AND NOT (
                ?2 IS NULL
                AND source = 'club'
                AND athlete_id IS NULL
                AND EXISTS (
                    SELECT 1 FROM athletes a
                    WHERE activities.athlete_name = a.display_name
                       OR (instr(a.display_name, ' ') > 0
                           AND activities.athlete_name =
                               substr(a.display_name, 1, instr(a.display_name, ' '))
                               || substr(a.display_name, instr(a.display_name, ' ') + 1, 1)
                               || '.')
                )
              )
            GROUP BY COALESCE(CAST(athlete_id AS TEXT), athlete_name)
            ORDER BY distance_km DESC, runs DESC
            LIMIT ?3
            "#,
        )
        .bind(since)
        .bind(source.map(|s| s.as_str()))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                Ok::<_, AppError>(LeaderboardEntry {
                    rank: i as u32 + 1,
                    athlete_id: row.try_get::<Option<i64>, _>("athlete_id")?.map(|id| id as u64),
                    athlete_name: row.try_get("athlete_name")?,
                    runs: row.try_get::<i64, _>("runs")? as u32,
                    distance_km: row.try_get("distance_km")?,
                    moving_time_secs: row.try_get("moving_time_secs")?,
                    elevation_gain_m: row.try_get("elevation_gain_m")?,
                })
            })
            .collect()
    }
}

/// Map an `athletes` row to a credential record.
fn map_row_to_athlete(row: &SqliteRow) -> Result<AthleteCredential, AppError> {
    Ok(AthleteCredential {
        athlete_id: row.try_get::<i64, _>("athlete_id")? as u64,
        display_name: row.try_get("display_name")?,
        access_token: row.try_get("access_token")?,
        refresh_token: row.try_get("refresh_token")?,
        expires_at: row.try_get("expires_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Map an `activities` row to a record.
fn map_row_to_activity(row: &SqliteRow) -> Result<ActivityRecord, AppError> {
    let source: String = row.try_get("source")?;
    Ok(ActivityRecord {
        dedup_key: row.try_get("dedup_key")?,
        source: source.parse().map_err(AppError::Database)?,
        athlete_id: row.try_get::<Option<i64>, _>("athlete_id")?.map(|id| id as u64),
        athlete_name: row.try_get("athlete_name")?,
        activity_id: row.try_get::<Option<i64>, _>("activity_id")?.map(|id| id as u64),
        name: row.try_get("name")?,
        sport_type: row.try_get("sport_type")?,
        start_date: row.try_get("start_date")?,
        start_date_local: row.try_get("start_date_local")?,
        activity_date: row.try_get("activity_date")?,
        iso_week: row.try_get("iso_week")?,
        distance_km: row.try_get("distance_km")?,
        moving_time_secs: row.try_get("moving_time_secs")?,
        elapsed_time_secs: row.try_get("elapsed_time_secs")?,
        elevation_gain_m: row.try_get("elevation_gain_m")?,
        pace: row.try_get("pace")?,
        photo_url: row.try_get("photo_url")?,
        fetched_at: row.try_get("fetched_at")?,
    })
}
