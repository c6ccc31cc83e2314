// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client and token lifecycle.
//!
//! Handles:
//! - OAuth code exchange and token refresh
//! - Club feed and athlete feed pagination
//! - Proactive refresh of tokens close to expiry

use crate::config::Config;
use crate::error::AppError;
use crate::services::fetcher::fetch_pages;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

/// OAuth scopes requested at authorization time.
pub const OAUTH_SCOPES: &str = "read,activity:read_all";

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    api_base: String,
    oauth_base: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials against production Strava.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: crate::config::STRAVA_API_BASE.to_string(),
            oauth_base: crate::config::STRAVA_OAUTH_BASE.to_string(),
            client_id,
            client_secret,
        }
    }

    /// Create a client from application config (honours base URL overrides).
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.strava_client_id.clone(),
            config.strava_client_secret.clone(),
        )
        .with_base_urls(&config.strava_api_base, &config.strava_oauth_base)
    }

    /// Point the client at different API/OAuth hosts.
    pub fn with_base_urls(mut self, api_base: &str, oauth_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.oauth_base = oauth_base.trim_end_matches('/').to_string();
        self
    }

    /// Build the authorization URL the user is redirected to.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&redirect_uri={}&response_type=code&approval_prompt=auto&scope={}&state={}",
            self.oauth_base,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            OAUTH_SCOPES,
            urlencoding::encode(state),
        )
    }

    /// One page of a club's activity feed.
    pub async fn list_club_activities(
        &self,
        access_token: &str,
        club_id: u64,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<StravaActivitySummary>, AppError> {
        let url = format!("{}/clubs/{}/activities", self.api_base, club_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("page", page.to_string()), ("per_page", per_page.to_string())])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        check_response_json(response).await
    }

    /// One page of the authenticated athlete's activities.
    pub async fn list_athlete_activities(
        &self,
        access_token: &str,
        after: i64, // Unix timestamp
        page: u32,
        per_page: u32,
    ) -> Result<Vec<StravaActivitySummary>, AppError> {
        let url = format!("{}/athlete/activities", self.api_base);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("after", after.to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        check_response_json(response).await
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenExchangeResponse, AppError> {
        self.post_token(&[("code", code), ("grant_type", "authorization_code")])
            .await
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, AppError> {
        self.post_token(&[
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn post_token<T: DeserializeOwned>(&self, grant: &[(&str, &str)]) -> Result<T, AppError> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let response = self
            .http
            .post(format!("{}/token", self.oauth_base))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token request failed: {}", e)))?;

        check_response_json(response).await
    }
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("Strava rate limit hit (429)");
            return Err(AppError::StravaApi(AppError::STRAVA_RATE_LIMIT.to_string()));
        }

        if status.as_u16() == 401 {
            return Err(AppError::StravaApi(AppError::STRAVA_TOKEN_ERROR.to_string()));
        }

        return Err(AppError::StravaApi(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
}

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

/// Token exchange response from Strava OAuth (includes athlete info).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub athlete: StravaAthlete,
}

/// Athlete info from OAuth token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaAthlete {
    pub id: u64,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
}

impl StravaAthlete {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.firstname.trim(), self.lastname.trim())
            .trim()
            .to_string()
    }
}

/// Activity as returned by either list endpoint.
///
/// Every field is optional: the club feed withholds `id` and the dates,
/// and either feed may omit fields for private or manual activities.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StravaActivitySummary {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub sport_type: Option<String>,
    /// Legacy activity type, still sent alongside `sport_type`
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub start_date: Option<String>,
    pub start_date_local: Option<String>,
    /// Meters
    pub distance: Option<f64>,
    /// Seconds
    pub moving_time: Option<i64>,
    /// Seconds
    pub elapsed_time: Option<i64>,
    /// Meters
    pub total_elevation_gain: Option<f64>,
    pub athlete: Option<ActivityAthlete>,
    pub photos: Option<ActivityPhotos>,
}

/// Athlete reference embedded in an activity.
///
/// Athlete feed: `id` only. Club feed: names only (last name truncated).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityAthlete {
    pub id: Option<u64>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

impl ActivityAthlete {
    /// "Firstname L." style name, if any part is present.
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.firstname.as_deref(), self.lastname.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityPhotos {
    pub primary: Option<PrimaryPhoto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrimaryPhoto {
    /// Size (in px, as a string key) to URL
    pub urls: Option<HashMap<String, String>>,
}

impl StravaActivitySummary {
    /// URL of the largest size of the primary photo.
    pub fn photo_url(&self) -> Option<&str> {
        let urls = self.photos.as_ref()?.primary.as_ref()?.urls.as_ref()?;
        // Unparseable sizes rank lowest; ties go to the greater URL.
        urls.iter()
            .max_by_key(|&(size, url)| (size.parse::<u32>().unwrap_or(0), url.as_str()))
            .map(|(_, url)| url.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StravaService - High-level service with token management
// ─────────────────────────────────────────────────────────────────────────────

use crate::db::Database;
use crate::models::AthleteCredential;
use crate::time_utils::format_utc_rfc3339;
use chrono::Utc;

/// Refresh when the access token expires within this many seconds.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Whether a token with the given expiry must be refreshed at `now`.
///
/// Missing expiry always refreshes.
pub fn needs_refresh(expires_at: Option<i64>, now: i64) -> bool {
    match expires_at {
        Some(expires_at) => expires_at - now <= TOKEN_REFRESH_MARGIN_SECS,
        None => true,
    }
}

/// High-level Strava service that manages token lifecycle and API calls.
#[derive(Clone)]
pub struct StravaService {
    client: StravaClient,
    db: Database,
}

impl StravaService {
    pub fn new(client: StravaClient, db: Database) -> Self {
        Self { client, db }
    }

    pub fn client(&self) -> &StravaClient {
        &self.client
    }

    // ─── Token Management ────────────────────────────────────────────────────

    /// Get a valid (non-expired) access token for the given athlete.
    pub async fn get_valid_access_token(&self, athlete_id: u64) -> Result<String, AppError> {
        let credential = self
            .db
            .get_athlete(athlete_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tokens for athlete {}", athlete_id)))?;

        Ok(self.ensure_fresh(credential).await?.access_token)
    }

    /// Refresh the credential if it is expired or about to expire, persisting
    /// the new tokens. Returns the credential to use.
    pub async fn ensure_fresh(
        &self,
        credential: AthleteCredential,
    ) -> Result<AthleteCredential, AppError> {
        let now = Utc::now();
        if !needs_refresh(credential.expires_at, now.timestamp()) {
            return Ok(credential);
        }

        let athlete_id = credential.athlete_id;
        tracing::info!(
            athlete_id,
            expires_at = ?credential.expires_at,
            "Access token expired or expiring, refreshing"
        );

        let new_tokens = self.client.refresh_token(&credential.refresh_token).await?;

        let refreshed = AthleteCredential {
            access_token: new_tokens.access_token,
            refresh_token: new_tokens.refresh_token,
            expires_at: Some(new_tokens.expires_at),
            updated_at: format_utc_rfc3339(now),
            ..credential
        };

        self.db.upsert_athlete(&refreshed).await?;

        tracing::info!(athlete_id, "Token refreshed and stored");
        Ok(refreshed)
    }

    // ─── OAuth Callback Handling ─────────────────────────────────────────────

    /// Handle OAuth callback: exchange code for tokens and store the athlete.
    pub async fn handle_oauth_callback(&self, code: &str) -> Result<OAuthResult, AppError> {
        let token_response = self.client.exchange_code(code).await?;

        let athlete_id = token_response.athlete.id;
        let display_name = token_response.athlete.display_name();

        let credential = AthleteCredential {
            athlete_id,
            display_name: display_name.clone(),
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            expires_at: Some(token_response.expires_at),
            updated_at: format_utc_rfc3339(Utc::now()),
        };

        self.db.upsert_athlete(&credential).await?;

        tracing::info!(
            athlete_id,
            display_name = %display_name,
            "OAuth callback handled, tokens stored"
        );

        Ok(OAuthResult {
            athlete_id,
            display_name,
            expires_at: token_response.expires_at,
        })
    }

    // ─── Feeds ───────────────────────────────────────────────────────────────

    /// All pages of a club's feed, bounded by `max_pages`.
    pub async fn club_activities(
        &self,
        access_token: &str,
        club_id: u64,
        per_page: u32,
        max_pages: u32,
    ) -> Result<Vec<StravaActivitySummary>, AppError> {
        let client = &self.client;
        fetch_pages(per_page, max_pages, move |page| {
            client.list_club_activities(access_token, club_id, page, per_page)
        })
        .await
    }

    /// All pages of an athlete's feed after `after`, bounded by `max_pages`.
    pub async fn athlete_activities(
        &self,
        access_token: &str,
        after: i64,
        per_page: u32,
        max_pages: u32,
    ) -> Result<Vec<StravaActivitySummary>, AppError> {
        let client = &self.client;
        fetch_pages(per_page, max_pages, move |page| {
            client.list_athlete_activities(access_token, after, page, per_page)
        })
        .await
    }
}

/// Result of handling OAuth callback.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OAuthResult {
    pub athlete_id: u64,
    pub display_name: String,
    pub expires_at: i64,
}
