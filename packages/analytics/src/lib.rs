#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Dashboard arithmetic over in-memory snapshots.
//!
//! Every function here is pure: it takes the user and complaint snapshots
//! the caller already fetched plus an explicit `now`, and returns
//! serializable report types. Keeping `now` a parameter keeps the whole
//! crate deterministic under test.
//!
//! Rates are percentages rounded to two decimals. "Settled" means a
//! status of resolved or beyond, so closed complaints count toward
//! resolution rates even though the heatmap ignores them.

pub mod details;
pub mod kpis;
pub mod realtime;
pub mod users;

use chrono::{DateTime, Datelike, Duration, Utc};
use civic_map_complaint_models::{ComplaintRecord, ComplaintStatus};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

/// Maps a dashboard timeframe label to a day count. Unknown labels fall
/// back to 30 days.
#[must_use]
pub fn timeframe_days(timeframe: &str) -> i64 {
    match timeframe {
        "7d" => 7,
        "90d" => 90,
        "1y" => 365,
        _ => 30,
    }
}

/// Whether a complaint reached the end of its lifecycle (resolved or
/// closed).
#[must_use]
pub fn is_settled(complaint: &ComplaintRecord) -> bool {
    complaint.status() >= ComplaintStatus::Resolved
}

/// Percentage of `part` in `whole`, rounded to two decimals. Zero when
/// `whole` is zero.
#[must_use]
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    round2(part as f64 / whole as f64 * 100.0)
}

/// Rounds to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Share of settled complaints, as a percentage.
#[must_use]
pub fn resolution_rate(complaints: &[ComplaintRecord]) -> f64 {
    let settled = complaints.iter().filter(|c| is_settled(c)).count();
    percent(settled, complaints.len())
}

/// Mean days from creation to last update across settled complaints.
/// Complaints missing either timestamp are skipped; zero when none
/// qualify.
#[must_use]
pub fn average_resolution_days(complaints: &[ComplaintRecord]) -> i64 {
    let durations: Vec<i64> = complaints
        .iter()
        .filter(|c| is_settled(c))
        .filter_map(|c| {
            let created = c.created_at?;
            let updated = c.updated_at?;
            Some((updated - created).num_days().max(0))
        })
        .collect();

    if durations.is_empty() {
        0
    } else {
        let count = i64::try_from(durations.len()).unwrap_or(i64::MAX);
        durations.iter().sum::<i64>() / count
    }
}

/// Direction of a growth comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

/// Volume of the current window against the window before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthRate {
    /// Items created within the last `window_days`.
    pub current: usize,
    /// Items created in the `window_days` before that.
    pub previous: usize,
    /// Percentage change; zero when the previous window was empty.
    pub growth_rate: f64,
    /// Direction of the change.
    pub trend: Trend,
}

/// Compares creation volume across two adjacent windows ending at `now`.
/// Items without a creation timestamp are counted in neither window.
pub fn growth<I>(created_at: I, now: DateTime<Utc>, window_days: i64) -> GrowthRate
where
    I: IntoIterator<Item = Option<DateTime<Utc>>>,
{
    let current_start = now - Duration::days(window_days);
    let previous_start = now - Duration::days(window_days * 2);

    let mut current = 0usize;
    let mut previous = 0usize;
    for created in created_at.into_iter().flatten() {
        if created >= current_start {
            current += 1;
        } else if created >= previous_start {
            previous += 1;
        }
    }

    let growth_rate = if previous == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        round2((current as f64 - previous as f64) / previous as f64 * 100.0)
    };

    let trend = if growth_rate > 0.0 {
        Trend::Up
    } else if growth_rate < 0.0 {
        Trend::Down
    } else {
        Trend::Stable
    };

    GrowthRate {
        current,
        previous,
        growth_rate,
        trend,
    }
}

/// Start of the current UTC day.
#[must_use]
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(now, |dt| dt.and_utc())
}

/// Start of the current UTC month.
#[must_use]
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .with_day(1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map_or(now, |dt| dt.and_utc())
}

/// Top labels by occurrence count, `None` entries bucketed as "Unknown".
/// Ties break on the label so the output is deterministic.
pub fn top_counts<'a, I>(labels: I, limit: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts = std::collections::BTreeMap::<String, usize>::new();
    for label in labels {
        let key = label.filter(|l| !l.is_empty()).unwrap_or("Unknown");
        *counts.entry(key.to_string()).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_map_complaint_models::Situation;

    fn settled(created_days_ago: i64, resolved_days_later: i64, now: DateTime<Utc>) -> ComplaintRecord {
        let created = now - Duration::days(created_days_ago);
        ComplaintRecord {
            situation: Situation {
                status: ComplaintStatus::Resolved,
            },
            created_at: Some(created),
            updated_at: Some(created + Duration::days(resolved_days_later)),
            ..ComplaintRecord::default()
        }
    }

    #[test]
    fn timeframe_labels() {
        assert_eq!(timeframe_days("7d"), 7);
        assert_eq!(timeframe_days("90d"), 90);
        assert_eq!(timeframe_days("1y"), 365);
        assert_eq!(timeframe_days("30d"), 30);
        assert_eq!(timeframe_days("whatever"), 30);
    }

    #[test]
    fn closed_counts_as_settled() {
        let mut c = ComplaintRecord::default();
        c.situation.status = ComplaintStatus::Closed;
        assert!(is_settled(&c));
        c.situation.status = ComplaintStatus::InProgress;
        assert!(!is_settled(&c));
    }

    #[test]
    fn percent_of_empty_whole_is_zero() {
        assert!((percent(3, 0)).abs() < f64::EPSILON);
        assert!((percent(1, 3) - 33.33).abs() < f64::EPSILON);
    }

    #[test]
    fn average_resolution_skips_undated() {
        let now = Utc::now();
        let complaints = vec![
            settled(10, 4, now),
            settled(10, 8, now),
            ComplaintRecord {
                situation: Situation {
                    status: ComplaintStatus::Resolved,
                },
                ..ComplaintRecord::default()
            },
        ];
        assert_eq!(average_resolution_days(&complaints), 6);
        assert_eq!(average_resolution_days(&[]), 0);
    }

    #[test]
    fn growth_compares_adjacent_windows() {
        let now = Utc::now();
        let created = vec![
            Some(now - Duration::days(1)),
            Some(now - Duration::days(2)),
            Some(now - Duration::days(3)),
            Some(now - Duration::days(10)),
            Some(now - Duration::days(12)),
            None,
        ];
        let rate = growth(created, now, 7);
        assert_eq!(rate.current, 3);
        assert_eq!(rate.previous, 2);
        assert!((rate.growth_rate - 50.0).abs() < f64::EPSILON);
        assert_eq!(rate.trend, Trend::Up);
    }

    #[test]
    fn growth_without_previous_window_is_stable() {
        let now = Utc::now();
        let rate = growth(vec![Some(now)], now, 7);
        assert_eq!(rate.previous, 0);
        assert_eq!(rate.trend, Trend::Stable);
    }

    #[test]
    fn top_counts_ranks_and_buckets_unknown() {
        let labels = vec![
            Some("Centro"),
            Some("Centro"),
            Some("Vila Nova"),
            None,
            Some(""),
        ];
        let ranked = top_counts(labels, 2);
        assert_eq!(ranked[0], ("Centro".to_string(), 2));
        assert_eq!(ranked[1], ("Unknown".to_string(), 2));
    }
}
