// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Challenge-Tracker API Server
//!
//! Runs time-boxed group fitness challenges: invitations, daily logging,
//! streak and point accounting, milestones, and analytics.

use challenge_tracker::{
    config::Config,
    db::FirestoreDb,
    services::{ChallengeService, DailyLogService, EventBus, MilestoneService, NotificationService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Challenge-Tracker API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Shared infrastructure: event bus, notifications, and the
    // per-challenge write locks used by every mutating service.
    let events = EventBus::new();
    let notifications = NotificationService::new(config.push_gateway_url.clone());
    let locks = Arc::new(dashmap::DashMap::new());

    let challenges = ChallengeService::new(
        db.clone(),
        events.clone(),
        notifications.clone(),
        locks.clone(),
    );
    let daily_logs = DailyLogService::new(
        db.clone(),
        events.clone(),
        notifications.clone(),
        locks.clone(),
    );
    let milestones = MilestoneService::new(db.clone(), events.clone(), notifications, locks);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        events,
        challenges,
        daily_logs,
        milestones,
    });

    // Build router
    let app = challenge_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("challenge_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
