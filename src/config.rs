//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honoured for local development.

use chrono::NaiveDate;
use std::env;

/// Production Strava REST API base.
pub const STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";
/// Production Strava OAuth base (authorize + token endpoints).
pub const STRAVA_OAUTH_BASE: &str = "https://www.strava.com/oauth";

/// Strava caps `per_page` at 200.
const MAX_PER_PAGE: u32 = 200;

/// How far before the cutoff the athlete feed is queried.
const FETCH_AFTER_SLACK_SECS: i64 = 86_400;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Strava OAuth client ID (public)
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Callback URL registered with the Strava application
    pub strava_redirect_uri: String,
    /// Club whose feed is pulled on every sync pass
    pub club_id: Option<u64>,
    /// Athlete whose token reads the club feed (defaults to the first stored athlete)
    pub club_reader_id: Option<u64>,
    /// sqlx connection string
    pub database_url: String,
    /// Activities that started before this date are not stored
    pub start_date: NaiveDate,
    /// Page size for both feeds
    pub per_page: u32,
    /// Upper bound on club feed pages per pass
    pub club_max_pages: u32,
    /// Upper bound on athlete feed pages per pass
    pub athlete_max_pages: u32,
    /// HMAC key for the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
    /// Bearer token required by `/sync` when set
    pub sync_token: Option<String>,
    /// Server port
    pub port: u16,
    pub strava_api_base: String,
    pub strava_oauth_base: String,
}

impl Config {
    /// Config for tests. Points at production Strava; override the bases
    /// when a mock server is in play.
    pub fn test_default() -> Self {
        Self {
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            strava_redirect_uri: "http://localhost:8080/auth/strava/callback".to_string(),
            club_id: Some(4242),
            club_reader_id: None,
            database_url: "sqlite::memory:".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            per_page: 100,
            club_max_pages: 5,
            athlete_max_pages: 10,
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
            sync_token: None,
            port: 8080,
            strava_api_base: STRAVA_API_BASE.to_string(),
            strava_oauth_base: STRAVA_OAUTH_BASE.to_string(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let strava_client_secret = required("STRAVA_CLIENT_SECRET")?;
        let oauth_state_key = optional("OAUTH_STATE_KEY")
            .unwrap_or_else(|| strava_client_secret.clone())
            .into_bytes();

        let start_date = match optional("START_DATE") {
            Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_| ConfigError::Invalid("START_DATE", raw))?,
            None => NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
        };

        let per_page = parse_or("PER_PAGE", 100u32)?;
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(ConfigError::Invalid("PER_PAGE", per_page.to_string()));
        }

        Ok(Self {
            strava_client_id: required("STRAVA_CLIENT_ID")?,
            strava_client_secret,
            strava_redirect_uri: required("STRAVA_REDIRECT_URI")?,
            club_id: parse_optional("STRAVA_CLUB_ID")?,
            club_reader_id: parse_optional("STRAVA_CLUB_READER_ID")?,
            database_url: optional("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://stride-sync.db?mode=rwc".to_string()),
            start_date,
            per_page,
            club_max_pages: parse_or("CLUB_MAX_PAGES", 5)?,
            athlete_max_pages: parse_or("ATHLETE_MAX_PAGES", 10)?,
            oauth_state_key,
            sync_token: optional("SYNC_TOKEN"),
            port: parse_or("PORT", 8080)?,
            strava_api_base: optional("STRAVA_API_BASE")
                .unwrap_or_else(|| STRAVA_API_BASE.to_string()),
            strava_oauth_base: optional("STRAVA_OAUTH_BASE")
                .unwrap_or_else(|| STRAVA_OAUTH_BASE.to_string()),
        })
    }

    /// Cutoff as a unix timestamp (midnight UTC).
    pub fn start_timestamp(&self) -> i64 {
        self.start_date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default()
    }

    /// Value for the athlete feed's `after` query.
    ///
    /// One day before the cutoff, so runs on the cutoff date in zones east
    /// of UTC are still fetched. The local-date filter makes the final call.
    pub fn fetch_after_timestamp(&self) -> i64 {
        self.start_timestamp() - FETCH_AFTER_SLACK_SECS
    }
}

/// Read a variable, treating empty/whitespace values as unset.
fn optional(name: &'static str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parse_optional<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    optional(name)
        .map(|raw| raw.parse().map_err(|_| ConfigError::Invalid(name, raw)))
        .transpose()
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    Ok(parse_optional(name)?.unwrap_or(default))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
