// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Business logic services.

pub mod fetcher;
pub mod normalize;
pub mod strava;
pub mod sync;

pub use strava::{StravaClient, StravaService};
pub use sync::{SyncService, SyncSummary};
