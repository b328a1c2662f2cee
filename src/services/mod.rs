// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod challenge;
pub mod daily_log;
pub mod events;
pub mod milestone;
pub mod notifications;

pub use challenge::{ChallengeLocks, ChallengeService, CreateChallengeInput, ReconcileReport};
pub use daily_log::{DailyLogService, LogInput, LogOutcome};
pub use events::{EngineEvent, EventBus, EventTopic};
pub use milestone::{AddMilestoneInput, MilestoneService};
pub use notifications::NotificationService;
