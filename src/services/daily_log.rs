// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily log submission service.
//!
//! Handles the core workflow:
//! 1. Validate the entry against challenge rules
//! 2. Enforce the one-log-per-day and weekly rest budget rules
//! 3. Update participant streak, points, and progress
//! 4. Advance the challenge-wide streak when the day is complete
//! 5. Evaluate milestones and store everything in one atomic write

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::streak::{advance_challenge_streak, next_daily_streak, points_for};
use crate::models::{
    ActivityType, ChallengeStatus, DailyLog, LogKind, Milestone, ParticipantStatus,
};
use crate::services::challenge::{challenge_lock, ChallengeLocks};
use crate::services::milestone::evaluate_milestones;
use crate::services::{EventBus, EventTopic, NotificationService};
use crate::time_utils::{days_between, start_of_day, week_start};

const MAX_NOTES_LEN: usize = 500;

/// Parameters for one daily log entry.
#[derive(Debug, Clone)]
pub struct LogInput {
    pub kind: LogKind,
    pub activity_type: Option<ActivityType>,
    pub notes: Option<String>,
    /// Day being logged; defaults to today. Normalized to UTC midnight.
    pub date: Option<DateTime<Utc>>,
}

/// Result of a successful log submission.
#[derive(Debug, Clone, Serialize)]
pub struct LogOutcome {
    pub log: DailyLog,
    pub daily_streak: u32,
    pub total_points: u32,
    pub progress: f64,
    pub challenge_streak: u32,
    pub milestones_achieved: Vec<Milestone>,
}

#[derive(Clone)]
pub struct DailyLogService {
    db: FirestoreDb,
    events: EventBus,
    notifications: NotificationService,
    locks: ChallengeLocks,
}

impl DailyLogService {
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

    /// Submit a daily log for `user_id` in `challenge_id`.
    pub async fn submit(
        &self,
        challenge_id: &str,
        user_id: &str,
        input: LogInput,
    ) -> Result<LogOutcome> {
        self.submit_at(challenge_id, user_id, input, Utc::now())
            .await
    }

    /// [`submit`] with an explicit clock, so multi-day histories can be
    /// driven deterministically.
    ///
    /// [`submit`]: DailyLogService::submit
    pub async fn submit_at(
        &self,
        challenge_id: &str,
        user_id: &str,
        input: LogInput,
        now: DateTime<Utc>,
    ) -> Result<LogOutcome> {
        // Input validation runs before any database access.
        match input.kind {
            LogKind::Activity if input.activity_type.is_none() => {
                return Err(AppError::Validation(
                    "Activity type is required for activity logs".to_string(),
                ));
            }
            LogKind::Rest if input.activity_type.is_some() => {
                return Err(AppError::Validation(
                    "Rest logs cannot carry an activity type".to_string(),
                ));
            }
            _ => {}
        }
        if input
            .notes
            .as_deref()
            .is_some_and(|n| n.len() > MAX_NOTES_LEN)
        {
            return Err(AppError::Validation(format!(
                "Notes cannot exceed {} characters",
                MAX_NOTES_LEN
            )));
        }

        let day = start_of_day(input.date.unwrap_or(now));

        let lock = challenge_lock(&self.locks, challenge_id);
        let _guard = lock.lock().await;

        let mut challenge = self
            .db
            .get_challenge(challenge_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;

        // A due transition (activation or expiry) takes effect before the
        // log is judged; the persisted transition rides along with the
        // log's own write.
        challenge.reconcile_status(now);
        if challenge.status != ChallengeStatus::Active {
            return Err(AppError::Conflict("Challenge is not active".to_string()));
        }

        {
            let participant = challenge.participant(user_id).ok_or_else(|| {
                AppError::Forbidden("Not a participant of this challenge".to_string())
            })?;
            if participant.status != ParticipantStatus::Accepted {
                return Err(AppError::Forbidden(
                    "Invitation has not been accepted".to_string(),
                ));
            }
        }

        if day < challenge.start_date {
            return Err(AppError::Validation(
                "Cannot log before the challenge start date".to_string(),
            ));
        }
        if day > start_of_day(now) {
            return Err(AppError::Validation(
                "Cannot log a future day".to_string(),
            ));
        }
        if day > challenge.time_limit {
            return Err(AppError::Validation(
                "Cannot log past the challenge deadline".to_string(),
            ));
        }

        if input.kind == LogKind::Activity && !challenge.allowed_activities.is_empty() {
            let activity = input.activity_type.unwrap_or(ActivityType::Other);
            if !challenge.allowed_activities.contains(&activity) {
                return Err(AppError::Validation(
                    "Activity type is not allowed in this challenge".to_string(),
                ));
            }
        }

        let logs = self.db.get_logs_for_user(challenge_id, user_id).await?;

        // Fast duplicate check; the transaction re-checks under isolation.
        if logs.iter().any(|l| l.date == day) {
            return Err(AppError::Conflict(
                "Already logged for this day".to_string(),
            ));
        }

        let rest_budget = challenge
            .participant(user_id)
            .map(|p| p.rest_days)
            .unwrap_or(0);

        if input.kind == LogKind::Rest {
            let week = week_start(day);
            let used = logs
                .iter()
                .filter(|l| l.kind == LogKind::Rest && week_start(l.date) == week)
                .count() as u32;
            if used >= rest_budget {
                return Err(AppError::QuotaExceeded(
                    "Weekly rest day budget exhausted".to_string(),
                ));
            }
        }

        let points = points_for(input.kind);
        let log = DailyLog {
            id: DailyLog::document_id(challenge_id, user_id, day),
            challenge_id: challenge_id.to_string(),
            user_id: user_id.to_string(),
            kind: input.kind,
            activity_type: input.activity_type,
            notes: input.notes,
            date: day,
            points,
            created_at: now,
        };

        let mut logs_plus = logs.clone();
        logs_plus.push(log.clone());
        logs_plus.sort_by_key(|l| l.date);

        // Participant progression.
        let logged_yesterday = logs.iter().any(|l| l.date == day - Duration::days(1));
        let total_challenge_days =
            (days_between(challenge.start_date, challenge.time_limit) + 1).max(1) as f64;
        let current_week = week_start(now);
        let rest_used_this_week = logs_plus
            .iter()
            .filter(|l| l.kind == LogKind::Rest && week_start(l.date) == current_week)
            .count() as u32;

        let (daily_streak, total_points, progress) = {
            let participant = challenge
                .participant_mut(user_id)
                .ok_or_else(|| AppError::NotFound("Participant not found".to_string()))?;

            participant.daily_streak = next_daily_streak(participant.daily_streak, logged_yesterday);
            participant.total_points += points;
            participant.rest_days_used_this_week = rest_used_this_week;
            participant.progress =
                (logs_plus.len() as f64 / total_challenge_days * 100.0).min(100.0);
            participant.last_log_date = Some(
                participant
                    .last_log_date
                    .map_or(day, |previous| previous.max(day)),
            );

            (
                participant.daily_streak,
                participant.total_points,
                participant.progress,
            )
        };

        // Challenge-wide streak: the log's day is complete when every
        // accepted participant has an entry for it.
        let day_logs = self.db.get_logs_for_day(challenge_id, day).await?;
        let mut logged_users: HashSet<&str> = day_logs.iter().map(|l| l.user_id.as_str()).collect();
        logged_users.insert(user_id);

        let day_complete = challenge
            .accepted_participants()
            .all(|p| logged_users.contains(p.user_id.as_str()));

        if day_complete {
            let advance = advance_challenge_streak(
                challenge.challenge_streak,
                challenge.last_complete_log_date,
                day,
            );
            challenge.challenge_streak = advance.streak;
            if advance.newly_counted {
                challenge.last_complete_log_date = Some(day);
            }
        }

        let milestones_achieved = evaluate_milestones(&mut challenge, user_id, &logs_plus, now);

        self.db.commit_daily_log(&mut challenge, &log).await?;

        self.events.publish(
            EventTopic::LogAdded,
            challenge_id,
            serde_json::json!({
                "user_id": user_id,
                "date": day,
                "kind": log.kind,
                "points": points,
            }),
        );
        self.events.publish(
            EventTopic::ChallengeUpdated,
            challenge_id,
            serde_json::json!({
                "challenge_streak": challenge.challenge_streak,
                "version": challenge.version,
            }),
        );

        for milestone in &milestones_achieved {
            self.events.publish(
                EventTopic::MilestoneAchieved,
                challenge_id,
                serde_json::json!({
                    "milestone_id": milestone.id,
                    "user_id": user_id,
                    "title": milestone.title,
                }),
            );

            let others: Vec<String> = challenge
                .accepted_participants()
                .filter(|p| p.user_id != user_id)
                .map(|p| p.user_id.clone())
                .collect();
            self.notifications
                .notify_all(
                    &others,
                    "Milestone achieved",
                    &format!("{} reached \"{}\"", user_id, milestone.title),
                )
                .await;
        }

        Ok(LogOutcome {
            log,
            daily_streak,
            total_points,
            progress,
            challenge_streak: challenge.challenge_streak,
            milestones_achieved,
        })
    }
}
