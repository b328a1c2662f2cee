// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Challenge and participant models, including the lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::daily_log::ActivityType;
use super::milestone::Milestone;

/// Challenge lifecycle status. `completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    Pending,
    Active,
    Expired,
    Completed,
}

/// Collaboration mode of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeKind {
    Competitive,
    Collaborative,
}

/// Role of a participant within a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Creator,
    Admin,
    Participant,
    Spectator,
}

/// Invitation / membership status of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

impl ParticipantStatus {
    /// Whether the invitation has been answered (accepted or rejected).
    pub fn has_responded(&self) -> bool {
        matches!(self, ParticipantStatus::Accepted | ParticipantStatus::Rejected)
    }
}

/// One user's membership and progress in one challenge.
///
/// Owned exclusively by the parent Challenge document; never addressed
/// independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub role: ParticipantRole,
    pub status: ParticipantStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub daily_streak: u32,
    #[serde(default)]
    pub total_points: u32,
    /// Weekly rest-day allowance, fixed at acceptance
    #[serde(default)]
    pub rest_days: u32,
    /// Denormalized projection of rest logs in the current week.
    /// The authoritative budget check counts stored logs.
    #[serde(default)]
    pub rest_days_used_this_week: u32,
    pub joined_at: Option<DateTime<Utc>>,
    pub last_log_date: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Participant {
    /// Creator entry: pre-accepted, first in the participant list.
    pub fn creator(user_id: &str, rest_days: u32, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            role: ParticipantRole::Creator,
            status: ParticipantStatus::Accepted,
            progress: 0.0,
            daily_streak: 0,
            total_points: 0,
            rest_days,
            rest_days_used_this_week: 0,
            joined_at: Some(now),
            last_log_date: None,
            rejected_at: None,
            rejection_reason: None,
        }
    }

    /// Invitee entry: pending until the user responds.
    pub fn invitee(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            role: ParticipantRole::Participant,
            status: ParticipantStatus::Pending,
            progress: 0.0,
            daily_streak: 0,
            total_points: 0,
            rest_days: 0,
            rest_days_used_this_week: 0,
            joined_at: None,
            last_log_date: None,
            rejected_at: None,
            rejection_reason: None,
        }
    }
}

/// Join record for querying a user's challenges without scanning the
/// challenges collection. Keyed by `{challenge_id}_{user_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeMember {
    pub challenge_id: String,
    pub user_id: String,
    pub invited_at: DateTime<Utc>,
}

/// A time-boxed shared commitment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Sport category (e.g. "running", "cycling", "workout")
    pub sport: String,
    pub kind: ChallengeKind,
    pub start_date: DateTime<Utc>,
    /// End date of the challenge window
    pub time_limit: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub status: ChallengeStatus,
    /// Challenge-wide streak: consecutive days on which every accepted
    /// participant logged
    #[serde(default)]
    pub challenge_streak: u32,
    pub last_complete_log_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub min_weekly_activities: u32,
    #[serde(default)]
    pub min_points_to_join: u32,
    #[serde(default)]
    pub allowed_activities: Vec<ActivityType>,
    #[serde(default)]
    pub require_daily_photo: bool,
    #[serde(default)]
    pub creator_rest_days: u32,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    pub created_by: String,
    /// Ordered by insertion; creator always first
    pub participants: Vec<Participant>,
    /// Optimistic concurrency version, incremented on every stored write
    #[serde(default)]
    pub version: u64,
}

impl Challenge {
    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn participant_mut(&mut self, user_id: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.user_id == user_id)
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participant(user_id).is_some()
    }

    /// Accepted participants, the set that counts for challenge-day
    /// completeness.
    pub fn accepted_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants
            .iter()
            .filter(|p| p.status == ParticipantStatus::Accepted)
    }

    /// Reconcile the lifecycle status against participant responses and
    /// wall-clock time. Returns true if the status changed.
    ///
    /// Checks run in priority order: full acceptance activates a pending
    /// challenge (once the start date has arrived); a fully-responded
    /// invitation round with fewer than two acceptances expires it; and a
    /// passed deadline expires anything not completed, overriding an
    /// activation in the same pass.
    pub fn reconcile_status(&mut self, now: DateTime<Utc>) -> bool {
        let before = self.status;

        let all_accepted = self
            .participants
            .iter()
            .all(|p| p.status == ParticipantStatus::Accepted);
        let all_responded = self.participants.iter().all(|p| p.status.has_responded());
        let accepted_count = self.accepted_participants().count();

        if self.status == ChallengeStatus::Pending && all_accepted && now >= self.start_date {
            self.status = ChallengeStatus::Active;
        } else if self.status == ChallengeStatus::Pending && all_responded && accepted_count < 2 {
            self.status = ChallengeStatus::Expired;
        }

        if now > self.time_limit && self.status != ChallengeStatus::Completed {
            self.status = ChallengeStatus::Expired;
        }

        self.status != before
    }
}
