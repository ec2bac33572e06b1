//! Detailed dashboard breakdowns: timeline, geography, categories,
//! status flow, and user segments.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use civic_map_complaint_models::{ComplaintRecord, ComplaintStatus, UserRecord, categorize};
use serde::Serialize;

use crate::is_settled;

/// One day of complaint volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelinePoint {
    /// Day in ISO `YYYY-MM-DD` form.
    pub date: NaiveDate,
    /// Complaints created that day.
    pub count: usize,
    /// Of those, how many are settled by now.
    pub resolved: usize,
}

/// Daily creation counts for the trailing `window_days`, oldest day
/// first. Every day appears, including empty ones.
#[must_use]
pub fn timeline(
    complaints: &[ComplaintRecord],
    now: DateTime<Utc>,
    window_days: i64,
) -> Vec<TimelinePoint> {
    let mut points = Vec::new();
    for offset in (0..window_days).rev() {
        let date = (now - Duration::days(offset)).date_naive();
        let day_complaints: Vec<&ComplaintRecord> = complaints
            .iter()
            .filter(|c| c.created_at.is_some_and(|at| at.date_naive() == date))
            .collect();
        points.push(TimelinePoint {
            date,
            count: day_complaints.len(),
            resolved: day_complaints.iter().filter(|c| is_settled(c)).count(),
        });
    }
    points
}

/// Complaint volume of one city, broken down by district.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CityBreakdown {
    pub total: usize,
    pub districts: BTreeMap<String, usize>,
}

/// Complaint volume per city and district. Missing address fields fall
/// into an "Unknown" bucket.
#[must_use]
pub fn geographical_breakdown(complaints: &[ComplaintRecord]) -> BTreeMap<String, CityBreakdown> {
    let mut breakdown = BTreeMap::<String, CityBreakdown>::new();
    for complaint in complaints {
        let city = complaint
            .address
            .city
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());
        let district = complaint
            .address
            .district
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());

        let entry = breakdown.entry(city).or_default();
        entry.total += 1;
        *entry.districts.entry(district).or_default() += 1;
    }
    breakdown
}

/// Complaint volume per derived category, keyed by the category label.
#[must_use]
pub fn category_breakdown(complaints: &[ComplaintRecord]) -> BTreeMap<String, usize> {
    let mut categories = BTreeMap::<String, usize>::new();
    for complaint in complaints {
        let category = categorize(&complaint.description).to_string();
        *categories.entry(category).or_default() += 1;
    }
    categories
}

/// Complaint counts per lifecycle status. Unlike the heatmap breakdown,
/// this one reports closed separately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusFlow {
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub closed: usize,
}

/// Counts complaints by status.
#[must_use]
pub fn status_flow(complaints: &[ComplaintRecord]) -> StatusFlow {
    let mut flow = StatusFlow::default();
    for complaint in complaints {
        match complaint.status() {
            ComplaintStatus::Pending => flow.pending += 1,
            ComplaintStatus::InProgress => flow.in_progress += 1,
            ComplaintStatus::Resolved => flow.resolved += 1,
            ComplaintStatus::Closed => flow.closed += 1,
        }
    }
    flow
}

/// User base segmented by activity. Segments overlap: a verified user
/// with six complaints appears in three of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSegments {
    /// Registered within the last 30 days.
    pub new: usize,
    /// At least one complaint.
    pub active: usize,
    /// Five or more complaints.
    pub super_active: usize,
    pub verified: usize,
}

/// Segments the user snapshot.
#[must_use]
pub fn user_segments(users: &[UserRecord], now: DateTime<Utc>) -> UserSegments {
    let cutoff = now - Duration::days(30);
    UserSegments {
        new: users
            .iter()
            .filter(|u| u.created_at.is_some_and(|at| at >= cutoff))
            .count(),
        active: users.iter().filter(|u| u.complaints_count > 0).count(),
        super_active: users.iter().filter(|u| u.complaints_count >= 5).count(),
        verified: users.iter().filter(|u| u.verified).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_map_complaint_models::{Address, Situation};

    fn located(city: &str, district: &str) -> ComplaintRecord {
        ComplaintRecord {
            address: Address {
                city: Some(city.to_string()),
                district: Some(district.to_string()),
                ..Address::default()
            },
            ..ComplaintRecord::default()
        }
    }

    #[test]
    fn timeline_covers_every_day_oldest_first() {
        let now = Utc::now();
        let complaints = vec![
            ComplaintRecord {
                created_at: Some(now),
                situation: Situation {
                    status: ComplaintStatus::Resolved,
                },
                ..ComplaintRecord::default()
            },
            ComplaintRecord {
                created_at: Some(now - Duration::days(2)),
                ..ComplaintRecord::default()
            },
        ];
        let points = timeline(&complaints, now, 7);
        assert_eq!(points.len(), 7);
        assert_eq!(points[0].date, (now - Duration::days(6)).date_naive());
        assert_eq!(points[6].count, 1);
        assert_eq!(points[6].resolved, 1);
        assert_eq!(points[4].count, 1);
        assert_eq!(points[4].resolved, 0);
    }

    #[test]
    fn geography_groups_districts_under_cities() {
        let complaints = vec![
            located("Imperatriz", "Centro"),
            located("Imperatriz", "Centro"),
            located("Imperatriz", "Vila Nova"),
            ComplaintRecord::default(),
        ];
        let breakdown = geographical_breakdown(&complaints);
        assert_eq!(breakdown["Imperatriz"].total, 3);
        assert_eq!(breakdown["Imperatriz"].districts["Centro"], 2);
        assert_eq!(breakdown["Unknown"].total, 1);
    }

    #[test]
    fn categories_use_description_keywords() {
        let complaints = vec![
            ComplaintRecord {
                description: "buraco na avenida".to_string(),
                ..ComplaintRecord::default()
            },
            ComplaintRecord {
                description: "lixo acumulado".to_string(),
                ..ComplaintRecord::default()
            },
            ComplaintRecord::default(),
        ];
        let categories = category_breakdown(&complaints);
        assert_eq!(categories["Infrastructure"], 1);
        assert_eq!(categories["Urban Cleaning"], 1);
        assert_eq!(categories["Other"], 1);
    }

    #[test]
    fn status_flow_reports_closed_separately() {
        let complaints = vec![
            ComplaintRecord::default(),
            ComplaintRecord {
                situation: Situation {
                    status: ComplaintStatus::Closed,
                },
                ..ComplaintRecord::default()
            },
        ];
        let flow = status_flow(&complaints);
        assert_eq!(flow.pending, 1);
        assert_eq!(flow.closed, 1);
    }

    #[test]
    fn segments_overlap() {
        let now = Utc::now();
        let users = vec![UserRecord {
            complaints_count: 6,
            verified: true,
            created_at: Some(now),
            ..UserRecord::default()
        }];
        let segments = user_segments(&users, now);
        assert_eq!(segments.new, 1);
        assert_eq!(segments.active, 1);
        assert_eq!(segments.super_active, 1);
        assert_eq!(segments.verified, 1);
    }
}
