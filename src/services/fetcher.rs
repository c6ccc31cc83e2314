// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Page-by-page accumulation for Strava list endpoints.

use crate::error::AppError;
use std::future::Future;

/// Fetch pages `1..=max_pages`, stopping after the first short page.
///
/// The first failed page aborts the whole fetch. No retries.
pub async fn fetch_pages<T, F, Fut>(
    per_page: u32,
    max_pages: u32,
    mut fetch_page: F,
) -> Result<Vec<T>, AppError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, AppError>>,
{
    let mut rows = Vec::new();

    for page in 1..=max_pages {
        let batch = fetch_page(page).await?;
        let count = batch.len();
        tracing::debug!(page, count, "Fetched page");

        rows.extend(batch);

        if count < per_page as usize {
            break;
        }
    }

    Ok(rows)
}
