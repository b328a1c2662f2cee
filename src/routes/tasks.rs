// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Task handler routes for the scheduled reconcile sweep.
//!
//! These endpoints are called by the scheduler, not directly by users.
//! They are protected by a shared verification token.

use crate::error::{AppError, Result};
use crate::services::ReconcileReport;
use crate::AppState;
use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use std::sync::Arc;

const TASKS_TOKEN_HEADER: &str = "x-tasks-token";

/// Task handler routes (called by the scheduler).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tasks/reconcile", post(reconcile))
}

/// Sweep all non-terminal challenges and apply due status transitions.
async fn reconcile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ReconcileReport>> {
    let provided = headers
        .get(TASKS_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    if provided.is_empty() || provided != state.config.tasks_verify_token {
        tracing::warn!("Blocked unauthorized access to reconcile task");
        return Err(AppError::Forbidden(
            "Invalid task verification token".to_string(),
        ));
    }

    let report = state.challenges.reconcile_all(chrono::Utc::now()).await?;
    Ok(Json(report))
}
