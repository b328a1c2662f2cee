// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only analytics derived from a participant's log history.
//!
//! Everything here is pure over the logs passed in, so the aggregation is
//! testable without a database and cheap to recompute on read.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::challenge::{Challenge, Participant};
use super::daily_log::{DailyLog, LogKind};
use super::streak::longest_streak;
use crate::time_utils::{days_between, week_start};

/// Sentinel for behavioral patterns with no supporting logs.
const NO_DATA: &str = "No data";

/// Top-level analytics report for one participant in one challenge.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub overview: Overview,
    pub activity_distribution: Vec<ActivityShare>,
    pub weekly_progress: Vec<WeeklyBucket>,
    pub personal_records: Vec<PersonalRecord>,
    pub patterns: Patterns,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    /// Whole days from challenge start to now (0 before the start)
    pub total_days: u32,
    pub active_days: u32,
    pub rest_days: u32,
    pub missed_days: u32,
    pub total_points: u32,
    pub average_points_per_day: f64,
    pub longest_streak: u32,
    pub current_streak: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityShare {
    pub activity_type: String,
    pub count: u32,
    /// Share of activity-kind logs (not of all logs)
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyBucket {
    /// 1-indexed week number relative to the challenge start
    pub week: i64,
    pub points: u32,
    pub activities: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonalRecord {
    pub record: RecordKind,
    pub value: u32,
    pub date: Option<DateTime<Utc>>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    LongestStreak,
    MaxPointsDay,
    MaxWeeklyActivities,
}

#[derive(Debug, Clone, Serialize)]
pub struct Patterns {
    pub most_active_day: String,
    pub most_active_time: String,
    pub preferred_activity: String,
}

impl AnalyticsReport {
    /// Build the full report from a participant's logs, which must all
    /// belong to `challenge`.
    pub fn build(
        challenge: &Challenge,
        participant: &Participant,
        logs: &[DailyLog],
        now: DateTime<Utc>,
    ) -> Self {
        let total_days = days_between(challenge.start_date, now).max(0) as u32;
        let active_days = logs.iter().filter(|l| l.kind == LogKind::Activity).count() as u32;
        let rest_days = logs.iter().filter(|l| l.kind == LogKind::Rest).count() as u32;
        let missed_days = total_days.saturating_sub(active_days + rest_days);
        let total_points = participant.total_points;
        let average_points_per_day = if total_days > 0 {
            f64::from(total_points) / f64::from(total_days)
        } else {
            0.0
        };

        let log_dates: Vec<DateTime<Utc>> = logs.iter().map(|l| l.date).collect();
        let longest = longest_streak(&log_dates);

        AnalyticsReport {
            overview: Overview {
                total_days,
                active_days,
                rest_days,
                missed_days,
                total_points,
                average_points_per_day,
                longest_streak: longest,
                current_streak: participant.daily_streak,
            },
            activity_distribution: activity_distribution(logs),
            weekly_progress: weekly_progress(logs, challenge.start_date),
            personal_records: personal_records(logs, longest),
            patterns: patterns(logs),
        }
    }
}

fn activity_distribution(logs: &[DailyLog]) -> Vec<ActivityShare> {
    let mut counts: BTreeMap<&'static str, u32> = BTreeMap::new();
    for log in logs.iter().filter(|l| l.kind == LogKind::Activity) {
        if let Some(activity) = log.activity_type {
            *counts.entry(activity.as_str()).or_insert(0) += 1;
        }
    }

    let total: u32 = counts.values().sum();
    counts
        .into_iter()
        .map(|(activity_type, count)| ActivityShare {
            activity_type: activity_type.to_string(),
            count,
            percentage: if total > 0 {
                f64::from(count) / f64::from(total) * 100.0
            } else {
                0.0
            },
        })
        .collect()
}

fn weekly_progress(logs: &[DailyLog], start_date: DateTime<Utc>) -> Vec<WeeklyBucket> {
    let mut weeks: BTreeMap<i64, WeeklyBucket> = BTreeMap::new();

    for log in logs {
        let week_index = days_between(start_date, log.date).div_euclid(7);
        let bucket = weeks.entry(week_index).or_insert(WeeklyBucket {
            week: week_index + 1,
            points: 0,
            activities: 0,
        });
        bucket.points += log.points;
        if log.kind == LogKind::Activity {
            bucket.activities += 1;
        }
    }

    weeks.into_values().collect()
}

fn personal_records(logs: &[DailyLog], longest: u32) -> Vec<PersonalRecord> {
    let mut records = Vec::new();

    if longest > 0 {
        records.push(PersonalRecord {
            record: RecordKind::LongestStreak,
            value: longest,
            date: None,
            description: "Longest consecutive days".to_string(),
        });
    }

    // Single day with the most points; omitted when no log scored any.
    if let Some(best) = logs.iter().filter(|l| l.points > 0).max_by_key(|l| l.points) {
        records.push(PersonalRecord {
            record: RecordKind::MaxPointsDay,
            value: best.points,
            date: Some(best.date),
            description: "Most points earned in a single day".to_string(),
        });
    }

    // Week (Monday-start) with the most activity logs.
    let mut weekly_activities: BTreeMap<DateTime<Utc>, u32> = BTreeMap::new();
    for log in logs.iter().filter(|l| l.kind == LogKind::Activity) {
        *weekly_activities.entry(week_start(log.date)).or_insert(0) += 1;
    }
    if let Some((&week, &count)) = weekly_activities.iter().max_by_key(|(_, &count)| count) {
        records.push(PersonalRecord {
            record: RecordKind::MaxWeeklyActivities,
            value: count,
            date: Some(week),
            description: "Most activities in a single week".to_string(),
        });
    }

    records
}

fn patterns(logs: &[DailyLog]) -> Patterns {
    let mut day_counts: BTreeMap<&'static str, u32> = BTreeMap::new();
    let mut time_counts: BTreeMap<&'static str, u32> = BTreeMap::new();
    let mut activity_counts: BTreeMap<&'static str, u32> = BTreeMap::new();

    for log in logs {
        let weekday = match log.date.weekday() {
            chrono::Weekday::Mon => "Monday",
            chrono::Weekday::Tue => "Tuesday",
            chrono::Weekday::Wed => "Wednesday",
            chrono::Weekday::Thu => "Thursday",
            chrono::Weekday::Fri => "Friday",
            chrono::Weekday::Sat => "Saturday",
            chrono::Weekday::Sun => "Sunday",
        };
        *day_counts.entry(weekday).or_insert(0) += 1;

        let hour = log.created_at.hour();
        let slot = if hour < 12 {
            "Morning"
        } else if hour < 17 {
            "Afternoon"
        } else {
            "Evening"
        };
        *time_counts.entry(slot).or_insert(0) += 1;

        if let Some(activity) = log.activity_type {
            *activity_counts.entry(activity.as_str()).or_insert(0) += 1;
        }
    }

    Patterns {
        most_active_day: most_frequent(&day_counts),
        most_active_time: most_frequent(&time_counts),
        preferred_activity: most_frequent(&activity_counts),
    }
}

fn most_frequent(counts: &BTreeMap<&'static str, u32>) -> String {
    counts
        .iter()
        .max_by_key(|(_, &count)| count)
        .map(|(&name, _)| name.to_string())
        .unwrap_or_else(|| NO_DATA.to_string())
}

/// Weekly activity summary for a user's most recent active challenge.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub weekly_activity_days: u32,
    pub weekly_rest_days: u32,
    pub weekly_points: u32,
    pub current_streak: u32,
    pub total_points: u32,
}

impl UserSummary {
    /// Build from the logs of the current Monday-start week.
    pub fn build(participant: Option<&Participant>, week_logs: &[DailyLog]) -> Self {
        UserSummary {
            weekly_activity_days: week_logs
                .iter()
                .filter(|l| l.kind == LogKind::Activity)
                .count() as u32,
            weekly_rest_days: week_logs.iter().filter(|l| l.kind == LogKind::Rest).count() as u32,
            weekly_points: week_logs.iter().map(|l| l.points).sum(),
            current_streak: participant.map_or(0, |p| p.daily_streak),
            total_points: participant.map_or(0, |p| p.total_points),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::challenge::{ChallengeKind, ChallengeStatus, ParticipantStatus};
    use crate::models::daily_log::ActivityType;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        // Monday
        Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
    }

    fn challenge() -> Challenge {
        Challenge {
            id: "ch1".to_string(),
            title: "Test".to_string(),
            description: String::new(),
            sport: "running".to_string(),
            kind: ChallengeKind::Competitive,
            start_date: start(),
            time_limit: start() + Duration::days(30),
            created_at: start(),
            status: ChallengeStatus::Active,
            challenge_streak: 0,
            last_complete_log_date: None,
            min_weekly_activities: 4,
            min_points_to_join: 0,
            allowed_activities: vec![],
            require_daily_photo: false,
            creator_rest_days: 1,
            milestones: vec![],
            created_by: "u1".to_string(),
            participants: vec![participant(30, 3)],
            version: 0,
        }
    }

    fn participant(points: u32, streak: u32) -> Participant {
        let mut p = Participant::creator("u1", 1, start());
        p.status = ParticipantStatus::Accepted;
        p.total_points = points;
        p.daily_streak = streak;
        p
    }

    fn log(offset_days: i64, kind: LogKind, activity: Option<ActivityType>, points: u32) -> DailyLog {
        let date = start() + Duration::days(offset_days);
        DailyLog {
            id: format!("ch1_u1_{}", date.format("%Y-%m-%d")),
            challenge_id: "ch1".to_string(),
            user_id: "u1".to_string(),
            kind,
            activity_type: activity,
            notes: None,
            date,
            points,
            created_at: date + Duration::hours(8),
        }
    }

    #[test]
    fn test_overview_counts_and_average() {
        let logs = vec![
            log(0, LogKind::Activity, Some(ActivityType::Running), 10),
            log(1, LogKind::Rest, None, 5),
            log(2, LogKind::Activity, Some(ActivityType::Cycling), 10),
        ];
        let c = challenge();
        let p = participant(25, 3);
        let now = start() + Duration::days(5);

        let report = AnalyticsReport::build(&c, &p, &logs, now);

        assert_eq!(report.overview.total_days, 5);
        assert_eq!(report.overview.active_days, 2);
        assert_eq!(report.overview.rest_days, 1);
        assert_eq!(report.overview.missed_days, 2);
        assert_eq!(report.overview.total_points, 25);
        assert!((report.overview.average_points_per_day - 5.0).abs() < f64::EPSILON);
        assert_eq!(report.overview.longest_streak, 3);
        assert_eq!(report.overview.current_streak, 3);
    }

    #[test]
    fn test_overview_clamps_before_start() {
        let c = challenge();
        let p = participant(0, 0);
        // "Now" precedes the challenge start.
        let report = AnalyticsReport::build(&c, &p, &[], start() - Duration::days(2));
        assert_eq!(report.overview.total_days, 0);
        assert_eq!(report.overview.missed_days, 0);
        assert_eq!(report.overview.average_points_per_day, 0.0);
    }

    #[test]
    fn test_distribution_percentage_over_activity_logs_only() {
        let logs = vec![
            log(0, LogKind::Activity, Some(ActivityType::Running), 10),
            log(1, LogKind::Activity, Some(ActivityType::Running), 10),
            log(2, LogKind::Activity, Some(ActivityType::Cycling), 10),
            log(3, LogKind::Rest, None, 5),
        ];
        let report =
            AnalyticsReport::build(&challenge(), &participant(35, 4), &logs, start() + Duration::days(4));

        let running = report
            .activity_distribution
            .iter()
            .find(|s| s.activity_type == "running")
            .unwrap();
        assert_eq!(running.count, 2);
        // 2 of 3 activity logs, the rest log does not dilute the share.
        assert!((running.percentage - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_weekly_buckets() {
        let logs = vec![
            log(0, LogKind::Activity, Some(ActivityType::Running), 10),
            log(6, LogKind::Rest, None, 5),
            log(7, LogKind::Activity, Some(ActivityType::Running), 10),
        ];
        let report =
            AnalyticsReport::build(&challenge(), &participant(25, 1), &logs, start() + Duration::days(8));

        assert_eq!(report.weekly_progress.len(), 2);
        assert_eq!(report.weekly_progress[0].week, 1);
        assert_eq!(report.weekly_progress[0].points, 15);
        assert_eq!(report.weekly_progress[0].activities, 1);
        assert_eq!(report.weekly_progress[1].week, 2);
        assert_eq!(report.weekly_progress[1].points, 10);
    }

    #[test]
    fn test_records_omitted_without_qualifying_logs() {
        let report =
            AnalyticsReport::build(&challenge(), &participant(0, 0), &[], start() + Duration::days(1));
        assert!(report.personal_records.is_empty());
    }

    #[test]
    fn test_records_present() {
        let logs = vec![
            log(0, LogKind::Activity, Some(ActivityType::Running), 10),
            log(1, LogKind::Rest, None, 5),
        ];
        let report =
            AnalyticsReport::build(&challenge(), &participant(15, 2), &logs, start() + Duration::days(2));

        let kinds: Vec<RecordKind> = report.personal_records.iter().map(|r| r.record).collect();
        assert!(kinds.contains(&RecordKind::LongestStreak));
        assert!(kinds.contains(&RecordKind::MaxPointsDay));
        assert!(kinds.contains(&RecordKind::MaxWeeklyActivities));

        let max_points = report
            .personal_records
            .iter()
            .find(|r| r.record == RecordKind::MaxPointsDay)
            .unwrap();
        assert_eq!(max_points.value, 10);
        assert_eq!(max_points.date, Some(start()));
    }

    #[test]
    fn test_patterns_no_data_sentinel() {
        let report =
            AnalyticsReport::build(&challenge(), &participant(0, 0), &[], start() + Duration::days(1));
        assert_eq!(report.patterns.most_active_day, "No data");
        assert_eq!(report.patterns.most_active_time, "No data");
        assert_eq!(report.patterns.preferred_activity, "No data");
    }

    #[test]
    fn test_patterns_most_frequent() {
        let logs = vec![
            log(0, LogKind::Activity, Some(ActivityType::Running), 10), // Monday, morning
            log(7, LogKind::Activity, Some(ActivityType::Running), 10), // Monday, morning
            log(1, LogKind::Activity, Some(ActivityType::Cycling), 10), // Tuesday
        ];
        let report =
            AnalyticsReport::build(&challenge(), &participant(30, 1), &logs, start() + Duration::days(8));

        assert_eq!(report.patterns.most_active_day, "Monday");
        assert_eq!(report.patterns.most_active_time, "Morning");
        assert_eq!(report.patterns.preferred_activity, "running");
    }

    #[test]
    fn test_user_summary_from_week_logs() {
        let logs = vec![
            log(0, LogKind::Activity, Some(ActivityType::Running), 10),
            log(1, LogKind::Rest, None, 5),
        ];
        let p = participant(15, 2);
        let summary = UserSummary::build(Some(&p), &logs);

        assert_eq!(summary.weekly_activity_days, 1);
        assert_eq!(summary.weekly_rest_days, 1);
        assert_eq!(summary.weekly_points, 15);
        assert_eq!(summary.current_streak, 2);
        assert_eq!(summary.total_points, 15);
    }
}
