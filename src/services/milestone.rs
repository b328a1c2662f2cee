// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Milestone management and evaluation.
//!
//! Creation is gated on role; evaluation runs in memory against a user's
//! log history so the daily-log flow can fold newly earned achievements
//! into the same atomic challenge write.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{Challenge, ChallengeStatus, DailyLog, Milestone, MilestoneGoal, ParticipantRole};
use crate::services::challenge::{challenge_lock, ChallengeLocks};
use crate::services::{EventBus, EventTopic, NotificationService};

/// Parameters for attaching a milestone to a challenge.
#[derive(Debug, Clone)]
pub struct AddMilestoneInput {
    pub title: String,
    pub description: String,
    pub goal: MilestoneGoal,
    pub icon: Option<String>,
    pub reward: Option<String>,
}

#[derive(Clone)]
pub struct MilestoneService {
    db: FirestoreDb,
    events: EventBus,
    notifications: NotificationService,
    locks: ChallengeLocks,
}

impl MilestoneService {
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

    /// Attach a milestone to a challenge. Only the creator or an admin
    /// may do this, and only while the challenge is pending or active.
    pub async fn add(
        &self,
        challenge_id: &str,
        user_id: &str,
        input: AddMilestoneInput,
    ) -> Result<Milestone> {
        if input.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if input.goal.target() == 0 {
            return Err(AppError::Validation(
                "Target must be at least 1".to_string(),
            ));
        }

        let lock = challenge_lock(&self.locks, challenge_id);
        let _guard = lock.lock().await;

        let mut challenge = self
            .db
            .get_challenge(challenge_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;

        let participant = challenge
            .participant(user_id)
            .ok_or_else(|| AppError::Forbidden("Not a participant of this challenge".to_string()))?;

        if !matches!(
            participant.role,
            ParticipantRole::Creator | ParticipantRole::Admin
        ) {
            return Err(AppError::Forbidden(
                "Only the creator or an admin may add milestones".to_string(),
            ));
        }

        if matches!(
            challenge.status,
            ChallengeStatus::Expired | ChallengeStatus::Completed
        ) {
            return Err(AppError::Conflict(
                "Challenge is no longer modifiable".to_string(),
            ));
        }

        let milestone = Milestone {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            description: input.description,
            goal: input.goal,
            icon: input.icon,
            reward: input.reward,
            achieved_by: Vec::new(),
            created_at: Utc::now(),
        };

        challenge.milestones.push(milestone.clone());
        self.db.save_challenge(&mut challenge).await?;

        self.events.publish(
            EventTopic::ChallengeUpdated,
            challenge_id,
            serde_json::json!({ "milestone_added": milestone.id }),
        );

        let others: Vec<String> = challenge
            .accepted_participants()
            .filter(|p| p.user_id != user_id)
            .map(|p| p.user_id.clone())
            .collect();
        self.notifications
            .notify_all(
                &others,
                "New milestone",
                &format!("\"{}\" was added to {}", milestone.title, challenge.title),
            )
            .await;

        Ok(milestone)
    }
}

/// Evaluate every milestone of a challenge against one user's log history,
/// recording achievements in place. Returns the milestones newly achieved.
///
/// Idempotent per user: a milestone already achieved is never re-recorded.
pub fn evaluate_milestones(
    challenge: &mut Challenge,
    user_id: &str,
    logs: &[DailyLog],
    now: DateTime<Utc>,
) -> Vec<Milestone> {
    let mut newly_achieved = Vec::new();

    for milestone in &mut challenge.milestones {
        let Some(value) = milestone.goal.progress(logs) else {
            continue;
        };

        if value >= milestone.goal.target() && milestone.record_achievement(user_id, value, now) {
            tracing::info!(
                challenge_id = %challenge.id,
                milestone_id = %milestone.id,
                user_id,
                value,
                "Milestone achieved"
            );
            newly_achieved.push(milestone.clone());
        }
    }

    newly_achieved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChallengeKind, LogKind, Participant};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn challenge_with_milestones(milestones: Vec<Milestone>) -> Challenge {
        Challenge {
            id: "ch1".to_string(),
            title: "Test".to_string(),
            description: String::new(),
            sport: "running".to_string(),
            kind: ChallengeKind::Collaborative,
            start_date: now() - Duration::days(10),
            time_limit: now() + Duration::days(20),
            created_at: now() - Duration::days(11),
            status: ChallengeStatus::Active,
            challenge_streak: 0,
            last_complete_log_date: None,
            min_weekly_activities: 4,
            min_points_to_join: 0,
            allowed_activities: vec![],
            require_daily_photo: false,
            creator_rest_days: 1,
            milestones,
            created_by: "u1".to_string(),
            participants: vec![Participant::creator("u1", 1, now())],
            version: 0,
        }
    }

    fn milestone(goal: MilestoneGoal) -> Milestone {
        Milestone {
            id: "m1".to_string(),
            title: "Milestone".to_string(),
            description: String::new(),
            goal,
            icon: None,
            reward: None,
            achieved_by: Vec::new(),
            created_at: now(),
        }
    }

    fn log(offset: i64, points: u32) -> DailyLog {
        let date = now() - Duration::days(offset);
        DailyLog {
            id: format!("ch1_u1_{}", date.format("%Y-%m-%d")),
            challenge_id: "ch1".to_string(),
            user_id: "u1".to_string(),
            kind: LogKind::Activity,
            activity_type: None,
            notes: None,
            date,
            points,
            created_at: date,
        }
    }

    #[test]
    fn test_points_milestone_achieved_at_threshold() {
        let mut c =
            challenge_with_milestones(vec![milestone(MilestoneGoal::Points { target: 20 })]);
        let logs = vec![log(1, 10), log(0, 10)];

        let achieved = evaluate_milestones(&mut c, "u1", &logs, now());
        assert_eq!(achieved.len(), 1);
        assert_eq!(c.milestones[0].achieved_by.len(), 1);
        assert_eq!(c.milestones[0].achieved_by[0].value, 20);
    }

    #[test]
    fn test_milestone_not_re_recorded() {
        let mut c =
            challenge_with_milestones(vec![milestone(MilestoneGoal::Points { target: 10 })]);
        let logs = vec![log(0, 10)];

        assert_eq!(evaluate_milestones(&mut c, "u1", &logs, now()).len(), 1);
        assert!(evaluate_milestones(&mut c, "u1", &logs, now()).is_empty());
        assert_eq!(c.milestones[0].achieved_by.len(), 1);
    }

    #[test]
    fn test_custom_milestone_never_auto_achieved() {
        let mut c =
            challenge_with_milestones(vec![milestone(MilestoneGoal::Custom { target: 1 })]);
        let logs = vec![log(0, 10)];

        assert!(evaluate_milestones(&mut c, "u1", &logs, now()).is_empty());
        assert!(c.milestones[0].achieved_by.is_empty());
    }

    #[test]
    fn test_below_target_not_achieved() {
        let mut c =
            challenge_with_milestones(vec![milestone(MilestoneGoal::Activities { target: 3 })]);
        let logs = vec![log(1, 10), log(0, 10)];

        assert!(evaluate_milestones(&mut c, "u1", &logs, now()).is_empty());
    }
}
