// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Challenge lifecycle service.
//!
//! Handles creation, invitation responses, and the periodic status
//! reconciliation sweep. All writes to a challenge document go through a
//! per-challenge mutex plus the optimistic version check in the database
//! layer.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{
    ActivityType, Challenge, ChallengeKind, ChallengeStatus, Milestone, Participant,
    ParticipantStatus,
};
use crate::services::{AddMilestoneInput, EventBus, EventTopic, NotificationService};
use crate::time_utils::start_of_day;

/// Weekly rest-day allowance ceiling.
pub const MAX_REST_DAYS: u32 = 6;

/// Per-challenge mutex map, shared across services via AppState.
pub type ChallengeLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Acquire the mutex for one challenge ID.
pub fn challenge_lock(locks: &ChallengeLocks, challenge_id: &str) -> Arc<Mutex<()>> {
    locks
        .entry(challenge_id.to_string())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// Parameters for creating a challenge.
#[derive(Debug, Clone)]
pub struct CreateChallengeInput {
    pub title: String,
    pub description: String,
    pub sport: String,
    pub kind: ChallengeKind,
    pub start_date: DateTime<Utc>,
    pub time_limit: DateTime<Utc>,
    pub invitees: Vec<String>,
    pub min_weekly_activities: u32,
    pub min_points_to_join: u32,
    pub allowed_activities: Vec<ActivityType>,
    pub require_daily_photo: bool,
    pub rest_days: u32,
    /// Milestones defined up front; more can be added later.
    pub milestones: Vec<AddMilestoneInput>,
}

/// Outcome of a reconcile sweep.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub scanned: usize,
    pub transitioned: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct ChallengeService {
    db: FirestoreDb,
    events: EventBus,
    notifications: NotificationService,
    locks: ChallengeLocks,
}

impl ChallengeService {
    pub fn new(
        db: FirestoreDb,
        events: EventBus,
        notifications: NotificationService,
        locks: ChallengeLocks,
    ) -> Self {
        Self {
            db,
            events,
            notifications,
            locks,
        }
    }

    /// Create a challenge with the caller as pre-accepted creator.
    pub async fn create(&self, creator_id: &str, input: CreateChallengeInput) -> Result<Challenge> {
        let now = Utc::now();

        let start_date = start_of_day(input.start_date);
        let time_limit = input.time_limit;

        if start_date < start_of_day(now) {
            return Err(AppError::Validation(
                "Start date cannot be in the past".to_string(),
            ));
        }
        if time_limit <= start_date {
            return Err(AppError::Validation(
                "Time limit must be after the start date".to_string(),
            ));
        }
        if input.rest_days > MAX_REST_DAYS {
            return Err(AppError::Validation(format!(
                "Rest days must be between 0 and {}",
                MAX_REST_DAYS
            )));
        }

        // Deduplicate invitees and drop a self-invite; the creator is
        // always the first participant.
        let mut invitees: Vec<String> = input
            .invitees
            .into_iter()
            .filter(|u| u != creator_id)
            .collect();
        invitees.sort();
        invitees.dedup();

        if invitees.is_empty() {
            return Err(AppError::Validation(
                "At least one invitee is required".to_string(),
            ));
        }

        let mut participants = vec![Participant::creator(creator_id, input.rest_days, now)];
        participants.extend(invitees.iter().map(|u| Participant::invitee(u)));

        let mut milestones = Vec::with_capacity(input.milestones.len());
        for m in input.milestones {
            if m.title.trim().is_empty() {
                return Err(AppError::Validation(
                    "Milestone title is required".to_string(),
                ));
            }
            if m.goal.target() == 0 {
                return Err(AppError::Validation(
                    "Milestone target must be at least 1".to_string(),
                ));
            }
            milestones.push(Milestone {
                id: uuid::Uuid::new_v4().to_string(),
                title: m.title,
                description: m.description,
                goal: m.goal,
                icon: m.icon,
                reward: m.reward,
                achieved_by: Vec::new(),
                created_at: now,
            });
        }

        let mut challenge = Challenge {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title,
            description: input.description,
            sport: input.sport,
            kind: input.kind,
            start_date,
            time_limit,
            created_at: now,
            status: ChallengeStatus::Pending,
            challenge_streak: 0,
            last_complete_log_date: None,
            min_weekly_activities: input.min_weekly_activities,
            min_points_to_join: input.min_points_to_join,
            allowed_activities: input.allowed_activities,
            require_daily_photo: input.require_daily_photo,
            creator_rest_days: input.rest_days,
            milestones,
            created_by: creator_id.to_string(),
            participants,
            version: 0,
        };

        // One reconciliation pass before the first write, so a freshly
        // created challenge is never persisted with a stale status.
        challenge.reconcile_status(now);

        self.db.create_challenge(&challenge).await?;

        self.events.publish(
            EventTopic::ChallengeUpdated,
            &challenge.id,
            serde_json::json!({ "status": challenge.status }),
        );
        self.notifications
            .notify_all(
                &invitees,
                "Challenge invitation",
                &format!("You have been invited to \"{}\"", challenge.title),
            )
            .await;

        Ok(challenge)
    }

    /// Record an invitation response (accept or decline) and reconcile the
    /// challenge status.
    pub async fn respond(
        &self,
        challenge_id: &str,
        user_id: &str,
        accept: bool,
        rest_days: Option<u32>,
        reason: Option<String>,
    ) -> Result<Challenge> {
        if let Some(days) = rest_days {
            if days > MAX_REST_DAYS {
                return Err(AppError::Validation(format!(
                    "Rest days must be between 0 and {}",
                    MAX_REST_DAYS
                )));
            }
        }

        let lock = challenge_lock(&self.locks, challenge_id);
        let _guard = lock.lock().await;

        let mut challenge = self
            .db
            .get_challenge(challenge_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;

        if challenge.status != ChallengeStatus::Pending {
            return Err(AppError::Conflict(
                "Challenge is no longer accepting responses".to_string(),
            ));
        }

        let now = Utc::now();
        let default_rest_days = challenge.creator_rest_days;
        let creator_id = challenge.created_by.clone();
        let title = challenge.title.clone();

        let participant = challenge
            .participant_mut(user_id)
            .ok_or_else(|| AppError::Forbidden("Not invited to this challenge".to_string()))?;

        if participant.status != ParticipantStatus::Pending {
            return Err(AppError::Conflict(
                "Invitation already answered".to_string(),
            ));
        }

        if accept {
            participant.status = ParticipantStatus::Accepted;
            participant.joined_at = Some(now);
            participant.rest_days = rest_days.unwrap_or(default_rest_days);
        } else {
            participant.status = ParticipantStatus::Rejected;
            participant.rejected_at = Some(now);
            participant.rejection_reason = reason;
        }

        let transitioned = challenge.reconcile_status(now);
        self.db.save_challenge(&mut challenge).await?;

        self.events.publish(
            EventTopic::ChallengeUpdated,
            &challenge.id,
            serde_json::json!({
                "user_id": user_id,
                "accepted": accept,
                "status": challenge.status,
            }),
        );

        let verb = if accept { "accepted" } else { "declined" };
        self.notifications
            .notify(
                &creator_id,
                "Invitation response",
                &format!("{} {} your challenge \"{}\"", user_id, verb, title),
            )
            .await;

        if transitioned {
            tracing::info!(
                challenge_id,
                status = ?challenge.status,
                "Challenge status transitioned after response"
            );
        }

        Ok(challenge)
    }

    /// Fetch a challenge, restricted to its participants.
    ///
    /// A due status transition is applied on read and persisted
    /// best-effort, so clients never see a stale pending/active status.
    pub async fn get_for_user(&self, challenge_id: &str, user_id: &str) -> Result<Challenge> {
        let mut challenge = self
            .db
            .get_challenge(challenge_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;

        if !challenge.is_participant(user_id) {
            return Err(AppError::Forbidden(
                "Not a participant of this challenge".to_string(),
            ));
        }

        if challenge.reconcile_status(Utc::now()) {
            let lock = challenge_lock(&self.locks, challenge_id);
            let _guard = lock.lock().await;
            match self.db.save_challenge(&mut challenge).await {
                Ok(()) => self.events.publish(
                    EventTopic::ChallengeUpdated,
                    &challenge.id,
                    serde_json::json!({ "status": challenge.status }),
                ),
                // A concurrent writer got there first; the view is still
                // correct and the sweep repairs the store.
                Err(AppError::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(challenge)
    }

    /// List every challenge the user belongs to, newest first. Due
    /// transitions are reflected in the returned view; persisting them is
    /// left to the sweep.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Challenge>> {
        let now = Utc::now();
        let mut challenges = self.db.challenges_for_user(user_id).await?;
        for challenge in &mut challenges {
            challenge.reconcile_status(now);
        }
        Ok(challenges)
    }

    /// Sweep all non-terminal challenges and apply due status transitions.
    ///
    /// Concurrent-write conflicts are skipped; the next sweep repairs them.
    pub async fn reconcile_all(&self, now: DateTime<Utc>) -> Result<ReconcileReport> {
        let challenges = self.db.reconcilable_challenges().await?;
        let scanned = challenges.len();
        let mut transitioned = 0;
        let mut skipped = 0;

        for mut challenge in challenges {
            let lock = challenge_lock(&self.locks, &challenge.id);
            let _guard = lock.lock().await;

            if !challenge.reconcile_status(now) {
                continue;
            }

            match self.db.save_challenge(&mut challenge).await {
                Ok(()) => {
                    transitioned += 1;
                    self.events.publish(
                        EventTopic::ChallengeUpdated,
                        &challenge.id,
                        serde_json::json!({ "status": challenge.status }),
                    );
                    tracing::info!(
                        challenge_id = %challenge.id,
                        status = ?challenge.status,
                        "Challenge reconciled"
                    );
                }
                Err(AppError::Conflict(_)) => {
                    skipped += 1;
                    tracing::warn!(
                        challenge_id = %challenge.id,
                        "Skipped reconcile due to concurrent write"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(scanned, transitioned, skipped, "Reconcile sweep complete");

        Ok(ReconcileReport {
            scanned,
            transitioned,
            skipped,
        })
    }
}
