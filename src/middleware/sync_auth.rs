// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared-secret guard for the sync trigger.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Require `Authorization: Bearer <SYNC_TOKEN>` when a sync token is configured.
///
/// Without a configured token the trigger is open (local development).
pub async fn require_sync_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.sync_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    if !provided.is_some_and(|token| bool::from(token.as_bytes().ct_eq(expected.as_bytes()))) {
        tracing::warn!(
            has_header = provided.is_some(),
            "Blocked sync trigger with missing or wrong token"
        );
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}
