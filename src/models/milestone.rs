// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Milestones: target conditions attached to a challenge.
//!
//! The goal is a tagged enum so each variant's progress formula is
//! exhaustively checked at compile time instead of string-keyed branching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::daily_log::{DailyLog, LogKind};
use super::streak::longest_streak;

/// Milestone goal with its numeric target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MilestoneGoal {
    /// Cumulative points reach the target
    Points { target: u32 },
    /// Longest streak observed in the log history reaches the target
    Streak { target: u32 },
    /// Count of activity-kind logs reaches the target
    Activities { target: u32 },
    /// Progress supplied externally; the engine only compares it
    Custom { target: u32 },
}

impl MilestoneGoal {
    pub fn target(&self) -> u32 {
        match self {
            MilestoneGoal::Points { target }
            | MilestoneGoal::Streak { target }
            | MilestoneGoal::Activities { target }
            | MilestoneGoal::Custom { target } => *target,
        }
    }

    /// Compute a user's progress toward this goal from their log history.
    ///
    /// Returns `None` for `Custom`, whose progress the engine never
    /// computes.
    pub fn progress(&self, logs: &[DailyLog]) -> Option<u32> {
        match self {
            MilestoneGoal::Points { .. } => Some(logs.iter().map(|l| l.points).sum()),
            MilestoneGoal::Activities { .. } => {
                Some(logs.iter().filter(|l| l.kind == LogKind::Activity).count() as u32)
            }
            MilestoneGoal::Streak { .. } => {
                let dates: Vec<DateTime<Utc>> = logs.iter().map(|l| l.date).collect();
                Some(longest_streak(&dates))
            }
            MilestoneGoal::Custom { .. } => None,
        }
    }
}

/// Record of one user achieving a milestone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub user_id: String,
    pub achieved_at: DateTime<Utc>,
    /// Progress value at the moment of achievement
    pub value: u32,
}

/// A target condition attached to a Challenge. Achievement records are
/// append-only, at most one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub goal: MilestoneGoal,
    pub icon: Option<String>,
    pub reward: Option<String>,
    #[serde(default)]
    pub achieved_by: Vec<Achievement>,
    pub created_at: DateTime<Utc>,
}

impl Milestone {
    pub fn is_achieved_by(&self, user_id: &str) -> bool {
        self.achieved_by.iter().any(|a| a.user_id == user_id)
    }

    /// Append an achievement record for `user_id` unless one already
    /// exists. Returns true when a record was appended.
    pub fn record_achievement(&mut self, user_id: &str, value: u32, now: DateTime<Utc>) -> bool {
        if self.is_achieved_by(user_id) {
            return false;
        }
        self.achieved_by.push(Achievement {
            user_id: user_id.to_string(),
            achieved_at: now,
            value,
        });
        true
    }
}
