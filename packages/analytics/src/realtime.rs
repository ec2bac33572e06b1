//! Realtime KPI block for the operations view.

use chrono::{DateTime, Duration, Utc};
use civic_map_complaint_models::{ComplaintRecord, ComplaintStatus, UserRecord};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::{
    average_resolution_days, is_settled, percent, resolution_rate, start_of_day, start_of_month,
};

/// Totals as of this moment.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTotals {
    pub total_users: usize,
    pub total_complaints: usize,
    pub resolved_complaints: usize,
    pub pending_complaints: usize,
}

/// Activity since the start of the current UTC day.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayActivity {
    pub new_users: usize,
    pub new_complaints: usize,
    /// Settled complaints whose last update happened today.
    pub resolved_today: usize,
}

/// Creation counts within a trailing window.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowActivity {
    pub new_users: usize,
    pub new_complaints: usize,
}

/// Operational efficiency rates.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Efficiency {
    /// Share of settled complaints, percentage.
    pub resolution_rate: f64,
    /// Mean days from creation to settlement.
    pub average_resolution_time: i64,
    /// Share of complaints past the pending state, percentage.
    pub response_rate: f64,
}

/// Severity of a realtime alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlertKind {
    Warning,
    Info,
}

/// Urgency of a realtime alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlertPriority {
    High,
    Medium,
}

/// A condition the operations view should surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub priority: AlertPriority,
}

/// The realtime KPI payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeKpis {
    pub current: CurrentTotals,
    pub today: TodayActivity,
    pub this_week: WindowActivity,
    pub this_month: WindowActivity,
    pub efficiency: Efficiency,
    pub alerts: Vec<Alert>,
}

impl RealtimeKpis {
    /// Computes the realtime block over the given snapshots.
    #[must_use]
    pub fn compute(
        users: &[UserRecord],
        complaints: &[ComplaintRecord],
        now: DateTime<Utc>,
    ) -> Self {
        let today = start_of_day(now);
        let week_start = now - Duration::days(7);
        let month_start = start_of_month(now);

        let users_since = |cutoff: DateTime<Utc>| {
            users
                .iter()
                .filter(|u| u.created_at.is_some_and(|at| at >= cutoff))
                .count()
        };
        let complaints_since = |cutoff: DateTime<Utc>| {
            complaints
                .iter()
                .filter(|c| c.created_at.is_some_and(|at| at >= cutoff))
                .count()
        };

        Self {
            current: CurrentTotals {
                total_users: users.len(),
                total_complaints: complaints.len(),
                resolved_complaints: complaints.iter().filter(|c| is_settled(c)).count(),
                pending_complaints: complaints
                    .iter()
                    .filter(|c| c.status() == ComplaintStatus::Pending)
                    .count(),
            },
            today: TodayActivity {
                new_users: users_since(today),
                new_complaints: complaints_since(today),
                resolved_today: complaints
                    .iter()
                    .filter(|c| is_settled(c) && c.updated_at.is_some_and(|at| at >= today))
                    .count(),
            },
            this_week: WindowActivity {
                new_users: users_since(week_start),
                new_complaints: complaints_since(week_start),
            },
            this_month: WindowActivity {
                new_users: users_since(month_start),
                new_complaints: complaints_since(month_start),
            },
            efficiency: Efficiency {
                resolution_rate: resolution_rate(complaints),
                average_resolution_time: average_resolution_days(complaints),
                response_rate: percent(
                    complaints
                        .iter()
                        .filter(|c| c.status() > ComplaintStatus::Pending)
                        .count(),
                    complaints.len(),
                ),
            },
            alerts: alerts(complaints, now),
        }
    }
}

/// Backlog threshold: pending complaints older than this raise a warning.
const STALE_PENDING_DAYS: i64 = 30;

/// Daily volume above this raises an informational alert.
const HIGH_VOLUME_THRESHOLD: usize = 10;

fn alerts(complaints: &[ComplaintRecord], now: DateTime<Utc>) -> Vec<Alert> {
    let mut alerts = Vec::new();

    let stale_cutoff = now - Duration::days(STALE_PENDING_DAYS);
    let stale_pending = complaints
        .iter()
        .filter(|c| {
            c.status() == ComplaintStatus::Pending
                && c.created_at.is_some_and(|at| at < stale_cutoff)
        })
        .count();
    if stale_pending > 0 {
        alerts.push(Alert {
            kind: AlertKind::Warning,
            message: format!(
                "{stale_pending} complaints pending for more than {STALE_PENDING_DAYS} days"
            ),
            priority: AlertPriority::High,
        });
    }

    let today = start_of_day(now);
    let today_count = complaints
        .iter()
        .filter(|c| c.created_at.is_some_and(|at| at >= today))
        .count();
    if today_count > HIGH_VOLUME_THRESHOLD {
        alerts.push(Alert {
            kind: AlertKind::Info,
            message: format!("High complaint volume today: {today_count}"),
            priority: AlertPriority::Medium,
        });
    }

    alerts
}
