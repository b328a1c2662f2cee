// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

pub mod analytics;
pub mod challenge;
pub mod daily_log;
pub mod milestone;
pub mod streak;

pub use analytics::{AnalyticsReport, UserSummary};
pub use challenge::{
    Challenge, ChallengeKind, ChallengeMember, ChallengeStatus, Participant, ParticipantRole,
    ParticipantStatus,
};
pub use daily_log::{ActivityType, DailyLog, LogKind};
pub use milestone::{Achievement, Milestone, MilestoneGoal};
