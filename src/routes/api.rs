// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    ActivityType, AnalyticsReport, Challenge, ChallengeKind, ChallengeStatus, LogKind, Milestone,
    MilestoneGoal, ParticipantStatus, UserSummary,
};
use crate::services::{AddMilestoneInput, CreateChallengeInput, LogInput, LogOutcome};
use crate::time_utils::week_start;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/challenges", post(create_challenge).get(list_challenges))
        .route("/api/challenges/{id}", get(get_challenge))
        .route("/api/challenges/{id}/respond", post(respond_to_invite))
        .route("/api/challenges/{id}/logs", post(submit_log))
        .route("/api/challenges/{id}/milestones", post(add_milestone))
        .route("/api/challenges/{id}/analytics", get(get_analytics))
        .route("/api/summary", get(get_summary))
}

// ─── Challenges ──────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChallengeRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    #[validate(length(min = 1, max = 50))]
    pub sport: String,
    pub kind: ChallengeKind,
    pub start_date: DateTime<Utc>,
    pub time_limit: DateTime<Utc>,
    #[validate(length(min = 1, max = 50))]
    pub invitees: Vec<String>,
    #[serde(default)]
    pub min_weekly_activities: u32,
    #[serde(default)]
    pub min_points_to_join: u32,
    #[serde(default)]
    pub allowed_activities: Vec<ActivityType>,
    #[serde(default)]
    pub require_daily_photo: bool,
    #[serde(default)]
    #[validate(range(max = 6))]
    pub rest_days: u32,
    /// Milestones defined up front
    #[serde(default)]
    pub milestones: Vec<MilestoneRequest>,
}

async fn create_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateChallengeRequest>,
) -> Result<Json<Challenge>> {
    payload.validate()?;

    let challenge = state
        .challenges
        .create(
            &user.user_id,
            CreateChallengeInput {
                title: payload.title,
                description: payload.description,
                sport: payload.sport,
                kind: payload.kind,
                start_date: payload.start_date,
                time_limit: payload.time_limit,
                invitees: payload.invitees,
                min_weekly_activities: payload.min_weekly_activities,
                min_points_to_join: payload.min_points_to_join,
                allowed_activities: payload.allowed_activities,
                require_daily_photo: payload.require_daily_photo,
                rest_days: payload.rest_days,
                milestones: payload
                    .milestones
                    .into_iter()
                    .map(|m| AddMilestoneInput {
                        title: m.title,
                        description: m.description,
                        goal: m.goal,
                        icon: m.icon,
                        reward: m.reward,
                    })
                    .collect(),
            },
        )
        .await?;

    Ok(Json(challenge))
}

async fn list_challenges(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Challenge>>> {
    let challenges = state.challenges.list_for_user(&user.user_id).await?;
    Ok(Json(challenges))
}

async fn get_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Challenge>> {
    let challenge = state.challenges.get_for_user(&id, &user.user_id).await?;
    Ok(Json(challenge))
}

// ─── Invitation Responses ────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct RespondRequest {
    pub accept: bool,
    /// Weekly rest-day allowance chosen by the invitee (accept only)
    #[validate(range(max = 6))]
    pub rest_days: Option<u32>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

async fn respond_to_invite(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<RespondRequest>,
) -> Result<Json<Challenge>> {
    payload.validate()?;

    let challenge = state
        .challenges
        .respond(
            &id,
            &user.user_id,
            payload.accept,
            payload.rest_days,
            payload.reason,
        )
        .await?;

    Ok(Json(challenge))
}

// ─── Daily Logs ──────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct LogRequest {
    pub kind: LogKind,
    pub activity_type: Option<ActivityType>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    /// Day being logged; defaults to today
    pub date: Option<DateTime<Utc>>,
}

async fn submit_log(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<LogRequest>,
) -> Result<Json<LogOutcome>> {
    payload.validate()?;

    let outcome = state
        .daily_logs
        .submit(
            &id,
            &user.user_id,
            LogInput {
                kind: payload.kind,
                activity_type: payload.activity_type,
                notes: payload.notes,
                date: payload.date,
            },
        )
        .await?;

    Ok(Json(outcome))
}

// ─── Milestones ──────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct MilestoneRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
    #[serde(flatten)]
    pub goal: MilestoneGoal,
    pub icon: Option<String>,
    pub reward: Option<String>,
}

async fn add_milestone(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<MilestoneRequest>,
) -> Result<Json<Milestone>> {
    payload.validate()?;

    let milestone = state
        .milestones
        .add(
            &id,
            &user.user_id,
            AddMilestoneInput {
                title: payload.title,
                description: payload.description,
                goal: payload.goal,
                icon: payload.icon,
                reward: payload.reward,
            },
        )
        .await?;

    Ok(Json(milestone))
}

// ─── Analytics ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AnalyticsQuery {
    /// Participant to report on; defaults to the caller
    user_id: Option<String>,
}

async fn get_analytics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsReport>> {
    let challenge = state.challenges.get_for_user(&id, &user.user_id).await?;

    let target = query.user_id.unwrap_or_else(|| user.user_id.clone());
    let participant = challenge
        .participant(&target)
        .ok_or_else(|| AppError::NotFound("Participant not found".to_string()))?
        .clone();

    let logs = state.db.get_logs_for_user(&id, &target).await?;
    let report = AnalyticsReport::build(&challenge, &participant, &logs, Utc::now());

    Ok(Json(report))
}

/// Weekly summary across the caller's most recent active challenge.
async fn get_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserSummary>> {
    let challenges = state.challenges.list_for_user(&user.user_id).await?;

    // Newest active challenge in which the caller has accepted.
    let current = challenges.into_iter().find(|c| {
        c.status == ChallengeStatus::Active
            && c.participant(&user.user_id)
                .is_some_and(|p| p.status == ParticipantStatus::Accepted)
    });

    let Some(challenge) = current else {
        return Ok(Json(UserSummary::build(None, &[])));
    };

    let logs = state
        .db
        .get_logs_for_user(&challenge.id, &user.user_id)
        .await?;

    let week = week_start(Utc::now());
    let week_logs: Vec<_> = logs
        .into_iter()
        .filter(|l| week_start(l.date) == week)
        .collect();

    Ok(Json(UserSummary::build(
        challenge.participant(&user.user_id),
        &week_logs,
    )))
}
