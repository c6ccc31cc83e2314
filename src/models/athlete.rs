//! Athlete credential model.

use serde::{Deserialize, Serialize};

/// OAuth credentials for an athlete who authorized the app.
///
/// Tokens are stored as issued by Strava; the store is trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteCredential {
    /// Strava athlete ID (primary key)
    pub athlete_id: u64,
    /// "Firstname Lastname" as reported at authorization time
    pub display_name: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry (unix seconds). `None` forces a refresh.
    pub expires_at: Option<i64>,
    /// Last write (RFC3339)
    pub updated_at: String,
}
