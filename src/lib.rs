// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Challenge-Tracker: group fitness challenges with streaks and milestones
//!
//! This crate provides the backend API for running time-boxed group
//! challenges: invitations, daily activity/rest logging, streak and point
//! accounting, milestones, and per-participant analytics.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{ChallengeService, DailyLogService, EventBus, MilestoneService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub events: EventBus,
    pub challenges: ChallengeService,
    pub daily_logs: DailyLogService,
    pub milestones: MilestoneService,
}
