// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for calendar-day and week arithmetic.
//!
//! The engine uses a single canonical timezone policy: every "calendar day"
//! and "week" is computed in UTC, regardless of where participants live.

use chrono::{DateTime, Datelike, Duration, SecondsFormat, TimeZone, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Normalize a timestamp to the start of its UTC calendar day.
pub fn start_of_day(date: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(date.year(), date.month(), date.day(), 0, 0, 0)
        .single()
        .unwrap_or(date)
}

/// Start of the week containing `date`: Monday 00:00 UTC.
pub fn week_start(date: DateTime<Utc>) -> DateTime<Utc> {
    let day = start_of_day(date);
    let days_from_monday = day.weekday().num_days_from_monday() as i64;
    day - Duration::days(days_from_monday)
}

/// Whole days from `from` to `to` (negative if `to` precedes `from`).
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (start_of_day(to) - start_of_day(from)).num_days()
}
