// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One fetch-and-upsert pass over the club feed and every athlete feed.
//!
//! Handles:
//! 1. Club feed with a single reader athlete's token
//! 2. Each stored athlete's own feed since the cutoff
//! 3. Normalization and idempotent upsert of every running activity

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::models::{ActivitySource, AthleteCredential};
use crate::services::normalize::{normalize, FeedContext};
use crate::services::strava::{StravaActivitySummary, StravaService};
use crate::time_utils::format_utc_rfc3339;
use serde::Serialize;

/// Counters for one feed.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FeedSummary {
    /// Raw activities returned by Strava
    pub fetched: u32,
    /// Dropped as non-running or before the cutoff
    pub filtered: u32,
    pub upserted: u32,
    /// Records whose upsert failed (logged and skipped)
    pub failed: u32,
    /// Why this feed was skipped, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FeedSummary {
    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// Per-athlete section of the summary.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AthleteSummary {
    pub athlete_id: u64,
    pub display_name: String,
    #[serde(flatten)]
    pub feed: FeedSummary,
}

/// JSON body returned by the sync trigger.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SyncSummary {
    pub club: FeedSummary,
    pub athletes: Vec<AthleteSummary>,
    pub total_upserted: u32,
}

/// Runs sync passes against Strava and the database.
pub struct SyncService {
    strava: StravaService,
    db: Database,
    config: Config,
}

impl SyncService {
    pub fn new(strava: StravaService, db: Database, config: Config) -> Self {
        Self { strava, db, config }
    }

    /// Run one full pass.
    ///
    /// Token failures are recorded per feed and the pass moves on. A failed
    /// feed request aborts the pass.
    pub async fn run(&self) -> Result<SyncSummary> {
        let mut athletes = self.db.list_athletes().await?;
        tracing::info!(athletes = athletes.len(), "Starting sync pass");

        let club = self.sync_club(&mut athletes).await?;

        let mut athlete_summaries = Vec::with_capacity(athletes.len());
        for credential in athletes {
            athlete_summaries.push(self.sync_athlete(credential).await?);
        }

        let total_upserted =
            club.upserted + athlete_summaries.iter().map(|a| a.feed.upserted).sum::<u32>();

        tracing::info!(
            club_upserted = club.upserted,
            total_upserted,
            "Sync pass complete"
        );

        Ok(SyncSummary {
            club,
            athletes: athlete_summaries,
            total_upserted,
        })
    }

    /// The reader's refreshed credential is written back into `athletes` so
    /// its own pass does not reuse a rotated refresh token.
    async fn sync_club(&self, athletes: &mut [AthleteCredential]) -> Result<FeedSummary> {
        let Some(club_id) = self.config.club_id else {
            return Ok(FeedSummary::skipped("no club configured"));
        };

        let reader = match self.config.club_reader_id {
            Some(id) => athletes.iter_mut().find(|a| a.athlete_id == id),
            None => athletes.first_mut(),
        };
        let Some(reader) = reader else {
            tracing::warn!(club_id, "No authorized athlete available to read the club feed");
            return Ok(FeedSummary::skipped("no authorized athlete to read club feed"));
        };

        let credential = match self.strava.ensure_fresh(reader.clone()).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(
                    club_id,
                    athlete_id = reader.athlete_id,
                    error = %e,
                    "Token refresh failed for club reader"
                );
                return Ok(FeedSummary::skipped(e.to_string()));
            }
        };
        *reader = credential.clone();

        let raw = self
            .strava
            .club_activities(
                &credential.access_token,
                club_id,
                self.config.per_page,
                self.config.club_max_pages,
            )
            .await?;

        tracing::info!(club_id, fetched = raw.len(), "Fetched club feed");

        let ctx = FeedContext {
            source: ActivitySource::Club,
            athlete_id: None,
            athlete_name: None,
            cutoff: self.config.start_date,
            fetched_at: format_utc_rfc3339(chrono::Utc::now()),
        };

        Ok(self.store(&raw, &ctx).await)
    }

    async fn sync_athlete(&self, credential: AthleteCredential) -> Result<AthleteSummary> {
        let athlete_id = credential.athlete_id;
        let display_name = credential.display_name.clone();

        let credential = match self.strava.ensure_fresh(credential).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(
                    athlete_id,
                    error = %e,
                    reauthorize = e.is_strava_token_error(),
                    "Token refresh failed, skipping athlete"
                );
                return Ok(AthleteSummary {
                    athlete_id,
                    display_name,
                    feed: FeedSummary::skipped(e.to_string()),
                });
            }
        };

        let raw = self
            .strava
            .athlete_activities(
                &credential.access_token,
                self.config.fetch_after_timestamp(),
                self.config.per_page,
                self.config.athlete_max_pages,
            )
            .await?;

        tracing::info!(athlete_id, fetched = raw.len(), "Fetched athlete feed");

        let ctx = FeedContext {
            source: ActivitySource::Athlete,
            athlete_id: Some(athlete_id),
            athlete_name: Some(display_name.clone()).filter(|n| !n.is_empty()),
            cutoff: self.config.start_date,
            fetched_at: format_utc_rfc3339(chrono::Utc::now()),
        };

        Ok(AthleteSummary {
            athlete_id,
            display_name,
            feed: self.store(&raw, &ctx).await,
        })
    }

    /// Normalize and upsert a batch. Per-record failures never abort.
    async fn store(&self, raw: &[StravaActivitySummary], ctx: &FeedContext) -> FeedSummary {
        let mut summary = FeedSummary {
            fetched: raw.len() as u32,
            ..Default::default()
        };

        for activity in raw {
            let Some(record) = normalize(activity, ctx) else {
                summary.filtered += 1;
                continue;
            };

            match self.db.upsert_activity(&record).await {
                Ok(_) => summary.upserted += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(
                        dedup_key = %record.dedup_key,
                        source = %ctx.source,
                        error = %e,
                        "Failed to upsert activity, skipping"
                    );
                }
            }
        }

        summary
    }
}

impl From<&crate::AppState> for SyncService {
    fn from(state: &crate::AppState) -> Self {
        Self::new(state.strava.clone(), state.db.clone(), state.config.clone())
    }
}

