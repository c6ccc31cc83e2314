// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod athlete;
pub mod leaderboard;

pub use activity::{ActivityRecord, ActivitySource};
pub use athlete::AthleteCredential;
pub use leaderboard::LeaderboardEntry;
