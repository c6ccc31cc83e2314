// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth authentication routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::services::strava::OAuthResult;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a signed state parameter stays valid.
const STATE_MAX_AGE_SECS: i64 = 10 * 60;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/strava", get(auth_start))
        .route("/auth/strava/callback", get(auth_callback))
}

/// Start OAuth flow - redirect to Strava authorization.
async fn auth_start(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let now = chrono::Utc::now().timestamp();
    let oauth_state = sign_state(now, &state.config.oauth_state_key)?;

    let auth_url = state
        .strava
        .client()
        .authorize_url(&state.config.strava_redirect_uri, &oauth_state);

    tracing::info!(
        client_id = %state.config.strava_client_id,
        redirect_uri = %state.config.strava_redirect_uri,
        "Starting OAuth flow, redirecting to Strava"
    );

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
    /// Scopes the athlete actually granted (comma separated)
    #[serde(default)]
    scope: Option<String>,
}

/// OAuth callback - exchange code for tokens and store the athlete.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<OAuthResult>> {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Strava");
        return Err(AppError::BadRequest(format!("Authorization denied: {}", error)));
    }

    let now = chrono::Utc::now().timestamp();
    let signed = params.state.as_deref().unwrap_or_default();
    if !verify_state(signed, &state.config.oauth_state_key, now) {
        tracing::warn!("Invalid, expired or tampered OAuth state parameter");
        return Err(AppError::BadRequest("Invalid OAuth state".to_string()));
    }

    if let Some(scope) = params.scope.as_deref() {
        if !scope.split(',').any(|s| s.trim().starts_with("activity:read")) {
            return Err(AppError::BadRequest(
                "Activity read access was not granted".to_string(),
            ));
        }
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    tracing::info!("Exchanging authorization code for tokens");
    let result = state.strava.handle_oauth_callback(&code).await?;

    Ok(Json(result))
}

/// Sign an issue timestamp into an opaque, URL-safe state value.
///
/// Format before encoding: `timestamp_hex|signature_hex`.
fn sign_state(issued_at: i64, secret: &[u8]) -> Result<String> {
    let payload = format!("{:x}", issued_at);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify signature and age of a state value produced by `sign_state`.
fn verify_state(state: &str, secret: &[u8], now: i64) -> bool {
    let Some(decoded) = URL_SAFE_NO_PAD
        .decode(state)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    else {
        return false;
    };

    let Some((payload, signature_hex)) = decoded.split_once('|') else {
        return false;
    };
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload.as_bytes());
    if mac.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return false;
    }

    i64::from_str_radix(payload, 16)
        .map(|issued_at| (0..=STATE_MAX_AGE_SECS).contains(&(now - issued_at)))
        .unwrap_or(false)
}
