// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Streak and points arithmetic.
//!
//! Pure functions over midnight-normalized log dates. All state transitions
//! of the daily-log engine route through here so the rules stay in one
//! place and are testable without a database.

use crate::time_utils::days_between;
use chrono::{DateTime, Utc};

use super::daily_log::LogKind;

/// Points awarded for an activity log.
pub const ACTIVITY_POINTS: u32 = 10;
/// Points awarded for a rest log.
pub const REST_POINTS: u32 = 5;

/// Flat point value for a log entry. No bonus tiers.
pub fn points_for(kind: LogKind) -> u32 {
    match kind {
        LogKind::Activity => ACTIVITY_POINTS,
        LogKind::Rest => REST_POINTS,
    }
}

/// Next per-participant daily streak after logging.
///
/// A log on the previous calendar day continues the streak; a first-ever
/// log starts it; any other gap resets to 1.
pub fn next_daily_streak(previous: u32, logged_yesterday: bool) -> u32 {
    if logged_yesterday || previous == 0 {
        previous + 1
    } else {
        1
    }
}

/// Outcome of evaluating a complete challenge day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeDayAdvance {
    /// New value for the challenge-wide streak.
    pub streak: u32,
    /// True when `day` was newly counted and `last_complete_log_date`
    /// must move to it. False means the day was already counted.
    pub newly_counted: bool,
}

/// Advance the challenge-wide streak for a day on which every accepted
/// participant has logged.
///
/// `last_complete` is the previous complete day (midnight-normalized), if
/// any. The day after the last counted one increments; a day at or before
/// it is a no-op (backdated logs must not rewind the streak); a larger
/// forward gap resets to 1.
pub fn advance_challenge_streak(
    current: u32,
    last_complete: Option<DateTime<Utc>>,
    day: DateTime<Utc>,
) -> ChallengeDayAdvance {
    let Some(last) = last_complete else {
        return ChallengeDayAdvance {
            streak: 1,
            newly_counted: true,
        };
    };

    match days_between(last, day) {
        d if d <= 0 => ChallengeDayAdvance {
            streak: current,
            newly_counted: false,
        },
        1 => ChallengeDayAdvance {
            streak: current + 1,
            newly_counted: true,
        },
        _ => ChallengeDayAdvance {
            streak: 1,
            newly_counted: true,
        },
    }
}

/// Longest run of consecutive calendar days in a log history.
///
/// Used for milestone progress and personal records: the monotonic maximum
/// ever observed, not the current streak. Dates must be midnight-normalized;
/// order does not matter.
pub fn longest_streak(dates: &[DateTime<Utc>]) -> u32 {
    if dates.is_empty() {
        return 0;
    }

    let mut sorted: Vec<DateTime<Utc>> = dates.to_vec();
    sorted.sort();
    sorted.dedup();

    let mut current = 1u32;
    let mut max = 1u32;
    for pair in sorted.windows(2) {
        if days_between(pair[0], pair[1]) == 1 {
            current += 1;
            max = max.max(current);
        } else {
            current = 1;
        }
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_points_are_flat() {
        assert_eq!(points_for(LogKind::Activity), 10);
        assert_eq!(points_for(LogKind::Rest), 5);
    }

    #[test]
    fn test_daily_streak_continues_after_yesterday() {
        assert_eq!(next_daily_streak(2, true), 3);
    }

    #[test]
    fn test_daily_streak_first_ever_log() {
        assert_eq!(next_daily_streak(0, false), 1);
    }

    #[test]
    fn test_daily_streak_resets_on_gap() {
        assert_eq!(next_daily_streak(5, false), 1);
    }

    #[test]
    fn test_challenge_streak_first_complete_day() {
        let adv = advance_challenge_streak(0, None, day(1));
        assert_eq!(adv.streak, 1);
        assert!(adv.newly_counted);
    }

    #[test]
    fn test_challenge_streak_consecutive_day_increments() {
        let adv = advance_challenge_streak(3, Some(day(4)), day(5));
        assert_eq!(adv.streak, 4);
        assert!(adv.newly_counted);
    }

    #[test]
    fn test_challenge_streak_same_day_is_noop() {
        let adv = advance_challenge_streak(3, Some(day(5)), day(5));
        assert_eq!(adv.streak, 3);
        assert!(!adv.newly_counted);
    }

    #[test]
    fn test_challenge_streak_gap_resets() {
        // Last complete day0, next complete day2: gap of 2 resets to 1.
        let adv = advance_challenge_streak(1, Some(day(1)), day(3));
        assert_eq!(adv.streak, 1);
        assert!(adv.newly_counted);
    }

    #[test]
    fn test_challenge_streak_backdated_day_is_noop() {
        // A backfilled log can complete a day older than the last counted
        // one. That must neither reset the streak nor rewind the marker,
        // or the next consecutive day would reset too.
        let adv = advance_challenge_streak(2, Some(day(3)), day(1));
        assert_eq!(adv.streak, 2);
        assert!(!adv.newly_counted);
    }

    #[test]
    fn test_longest_streak_consecutive() {
        let dates = vec![day(1), day(2), day(3)];
        assert_eq!(longest_streak(&dates), 3);
    }

    #[test]
    fn test_longest_streak_with_gap() {
        let dates = vec![day(1), day(3)];
        assert_eq!(longest_streak(&dates), 1);
    }

    #[test]
    fn test_longest_streak_is_monotonic_max() {
        // 4 consecutive days, a gap, then 2 consecutive: the max is 4.
        let dates = vec![day(1), day(2), day(3), day(4), day(10), day(11)];
        assert_eq!(longest_streak(&dates), 4);
    }

    #[test]
    fn test_longest_streak_unordered_and_duplicated_input() {
        let dates = vec![day(3), day(1), day(2), day(2)];
        assert_eq!(longest_streak(&dates), 3);
    }

    #[test]
    fn test_longest_streak_empty() {
        assert_eq!(longest_streak(&[]), 0);
    }
}
