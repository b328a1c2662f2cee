// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily log records: one entry per participant per challenge per UTC day.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a daily log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Activity,
    Rest,
}

/// Activity sub-type, required when the log kind is `activity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Running,
    Cycling,
    Swimming,
    Gym,
    Yoga,
    Walking,
    Hiking,
    Other,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Running => "running",
            ActivityType::Cycling => "cycling",
            ActivityType::Swimming => "swimming",
            ActivityType::Gym => "gym",
            ActivityType::Yoga => "yoga",
            ActivityType::Walking => "walking",
            ActivityType::Hiking => "hiking",
            ActivityType::Other => "other",
        }
    }
}

/// Stored daily log record.
///
/// Immutable once created. The document ID is the composite key
/// `{challenge_id}_{user_id}_{YYYY-MM-DD}`, which makes the store's write
/// an insert-if-absent on the uniqueness tuple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyLog {
    /// Composite document ID (also the uniqueness key)
    pub id: String,
    /// Parent challenge ID
    pub challenge_id: String,
    /// Owning user ID
    pub user_id: String,
    /// Entry kind
    pub kind: LogKind,
    /// Activity sub-type (present iff kind is activity)
    pub activity_type: Option<ActivityType>,
    /// Free-text note
    pub notes: Option<String>,
    /// Calendar day, normalized to UTC midnight
    pub date: DateTime<Utc>,
    /// Points awarded for this entry
    pub points: u32,
    /// When this entry was recorded
    pub created_at: DateTime<Utc>,
}

impl DailyLog {
    /// Composite document ID for the (challenge, user, day) tuple.
    ///
    /// User IDs are opaque strings, so the user component is URL-encoded to
    /// keep the ID free of separator collisions.
    pub fn document_id(challenge_id: &str, user_id: &str, day: DateTime<Utc>) -> String {
        format!(
            "{}_{}_{}",
            challenge_id,
            urlencoding::encode(user_id),
            day.format("%Y-%m-%d")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_document_id_is_deterministic() {
        let day = Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap();
        let a = DailyLog::document_id("ch1", "user-1", day);
        let b = DailyLog::document_id("ch1", "user-1", day);
        assert_eq!(a, b);
        assert_eq!(a, "ch1_user-1_2026-03-14");
    }

    #[test]
    fn test_document_id_encodes_user_separator() {
        let day = Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap();
        let id = DailyLog::document_id("ch1", "user 1/x", day);
        assert!(!id.contains(' '));
        assert!(!id.contains('/'));
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LogKind::Rest).unwrap(), "\"rest\"");
        assert_eq!(
            serde_json::to_string(&ActivityType::Running).unwrap(),
            "\"running\""
        );
    }
}
