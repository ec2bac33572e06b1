//! Main dashboard KPI block.

use chrono::{DateTime, Duration, Utc};
use civic_map_complaint_models::{ComplaintRecord, ComplaintStatus, UserRecord};
use serde::Serialize;

use crate::{GrowthRate, average_resolution_days, growth, is_settled, percent, round2};

/// User-side KPIs for the dashboard timeframe.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserKpis {
    pub total: usize,
    /// Users created within the timeframe.
    pub new: usize,
    /// Users with at least one complaint.
    pub active: usize,
    pub verified: usize,
    pub growth_rate: GrowthRate,
}

/// Complaint-side KPIs for the dashboard timeframe.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintKpis {
    pub total: usize,
    /// Complaints created within the timeframe.
    pub new: usize,
    /// Settled complaints (resolved or closed).
    pub resolved: usize,
    pub pending: usize,
    pub in_progress: usize,
    /// Share of settled complaints, percentage.
    pub resolution_rate: f64,
    /// Mean days from creation to settlement.
    pub average_resolution_time: i64,
    pub growth_rate: GrowthRate,
}

/// A user ranked by submission volume.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    pub id: String,
    pub name: String,
    pub complaints_count: u32,
    pub verified: bool,
}

/// How engaged the user base is.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementKpis {
    pub complaints_per_user: f64,
    pub active_users_percentage: f64,
    pub average_complaints_per_active_user: f64,
    pub top_contributors: Vec<Contributor>,
}

/// How complete submitted complaints are.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityKpis {
    pub complaints_with_images: usize,
    pub average_description_length: usize,
    /// Mean completeness of complaints against a four-point checklist,
    /// percentage.
    pub completeness_score: f64,
    /// Share of complaints with more than one similar report, percentage.
    pub duplicate_rate: f64,
}

/// The full KPI block of the main dashboard endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub users: UserKpis,
    pub complaints: ComplaintKpis,
    pub engagement: EngagementKpis,
    pub quality: QualityKpis,
}

impl Kpis {
    /// Computes the KPI block over the given snapshots.
    #[must_use]
    pub fn compute(
        users: &[UserRecord],
        complaints: &[ComplaintRecord],
        now: DateTime<Utc>,
        window_days: i64,
    ) -> Self {
        let cutoff = now - Duration::days(window_days);
        let active_users = users.iter().filter(|u| u.complaints_count > 0).count();

        Self {
            users: UserKpis {
                total: users.len(),
                new: users
                    .iter()
                    .filter(|u| u.created_at.is_some_and(|at| at >= cutoff))
                    .count(),
                active: active_users,
                verified: users.iter().filter(|u| u.verified).count(),
                growth_rate: growth(users.iter().map(|u| u.created_at), now, window_days),
            },
            complaints: ComplaintKpis {
                total: complaints.len(),
                new: complaints
                    .iter()
                    .filter(|c| c.created_at.is_some_and(|at| at >= cutoff))
                    .count(),
                resolved: complaints.iter().filter(|c| is_settled(c)).count(),
                pending: complaints
                    .iter()
                    .filter(|c| c.status() == ComplaintStatus::Pending)
                    .count(),
                in_progress: complaints
                    .iter()
                    .filter(|c| c.status() == ComplaintStatus::InProgress)
                    .count(),
                resolution_rate: crate::resolution_rate(complaints),
                average_resolution_time: average_resolution_days(complaints),
                growth_rate: growth(complaints.iter().map(|c| c.created_at), now, window_days),
            },
            engagement: engagement(users, complaints, active_users),
            quality: quality(complaints),
        }
    }
}

fn engagement(
    users: &[UserRecord],
    complaints: &[ComplaintRecord],
    active_users: usize,
) -> EngagementKpis {
    #[allow(clippy::cast_precision_loss)]
    let complaints_per_user = if users.is_empty() {
        0.0
    } else {
        round2(complaints.len() as f64 / users.len() as f64)
    };

    let active_total: u64 = users
        .iter()
        .filter(|u| u.complaints_count > 0)
        .map(|u| u64::from(u.complaints_count))
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let average_complaints_per_active_user = if active_users == 0 {
        0.0
    } else {
        round2(active_total as f64 / active_users as f64)
    };

    EngagementKpis {
        complaints_per_user,
        active_users_percentage: percent(active_users, users.len()),
        average_complaints_per_active_user,
        top_contributors: top_contributors(users, 5),
    }
}

/// Users with at least one complaint, most prolific first. Ties break on
/// UID so the ranking is deterministic.
fn top_contributors(users: &[UserRecord], limit: usize) -> Vec<Contributor> {
    let mut ranked: Vec<&UserRecord> =
        users.iter().filter(|u| u.complaints_count > 0).collect();
    ranked.sort_by(|a, b| {
        b.complaints_count
            .cmp(&a.complaints_count)
            .then_with(|| a.uid.cmp(&b.uid))
    });
    ranked
        .into_iter()
        .take(limit)
        .map(|u| Contributor {
            id: u.uid.clone(),
            name: if u.full_name.is_empty() {
                u.email.clone()
            } else {
                u.full_name.clone()
            },
            complaints_count: u.complaints_count,
            verified: u.verified,
        })
        .collect()
}

/// Checklist items worth 25 points each: a meaningful description, a
/// photo, a street, and a district plus city.
fn completeness_points(complaint: &ComplaintRecord) -> u32 {
    let mut points = 0;
    if complaint.description.len() > 10 {
        points += 25;
    }
    if complaint.image_url.is_some() {
        points += 25;
    }
    if complaint.address.street.is_some() {
        points += 25;
    }
    if complaint.address.district.is_some() && complaint.address.city.is_some() {
        points += 25;
    }
    points
}

fn quality(complaints: &[ComplaintRecord]) -> QualityKpis {
    let total_length: usize = complaints.iter().map(|c| c.description.len()).sum();
    let average_description_length = if complaints.is_empty() {
        0
    } else {
        total_length / complaints.len()
    };

    let total_points: u32 = complaints.iter().map(completeness_points).sum();
    #[allow(clippy::cast_precision_loss)]
    let completeness_score = if complaints.is_empty() {
        0.0
    } else {
        round2(f64::from(total_points) / complaints.len() as f64)
    };

    QualityKpis {
        complaints_with_images: complaints.iter().filter(|c| c.image_url.is_some()).count(),
        average_description_length,
        completeness_score,
        duplicate_rate: percent(
            complaints.iter().filter(|c| c.similar_count > 1).count(),
            complaints.len(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_map_complaint_models::{Address, Situation};

    fn user(uid: &str, complaints_count: u32, verified: bool) -> UserRecord {
        UserRecord {
            uid: uid.to_string(),
            full_name: format!("User {uid}"),
            complaints_count,
            verified,
            ..UserRecord::default()
        }
    }

    fn complaint(status: ComplaintStatus, created_days_ago: i64, now: DateTime<Utc>) -> ComplaintRecord {
        ComplaintRecord {
            description: "calçada interditada".to_string(),
            situation: Situation { status },
            created_at: Some(now - Duration::days(created_days_ago)),
            ..ComplaintRecord::default()
        }
    }

    #[test]
    fn empty_snapshots_produce_zeroed_kpis() {
        let kpis = Kpis::compute(&[], &[], Utc::now(), 30);
        assert_eq!(kpis.users.total, 0);
        assert_eq!(kpis.complaints.total, 0);
        assert!(kpis.engagement.top_contributors.is_empty());
        assert!((kpis.quality.completeness_score).abs() < f64::EPSILON);
    }

    #[test]
    fn counts_statuses_and_resolution_rate() {
        let now = Utc::now();
        let complaints = vec![
            complaint(ComplaintStatus::Pending, 1, now),
            complaint(ComplaintStatus::InProgress, 2, now),
            complaint(ComplaintStatus::Resolved, 3, now),
            complaint(ComplaintStatus::Closed, 4, now),
        ];
        let kpis = Kpis::compute(&[], &complaints, now, 30);
        assert_eq!(kpis.complaints.pending, 1);
        assert_eq!(kpis.complaints.in_progress, 1);
        // resolved and closed both count as settled
        assert_eq!(kpis.complaints.resolved, 2);
        assert!((kpis.complaints.resolution_rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn new_items_respect_the_window() {
        let now = Utc::now();
        let complaints = vec![
            complaint(ComplaintStatus::Pending, 5, now),
            complaint(ComplaintStatus::Pending, 40, now),
        ];
        let kpis = Kpis::compute(&[], &complaints, now, 30);
        assert_eq!(kpis.complaints.new, 1);
        assert_eq!(kpis.complaints.total, 2);
    }

    #[test]
    fn top_contributors_rank_by_volume() {
        let users = vec![
            user("a", 2, false),
            user("b", 7, true),
            user("c", 0, true),
            user("d", 7, false),
        ];
        let kpis = Kpis::compute(&users, &[], Utc::now(), 30);
        let top = &kpis.engagement.top_contributors;
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].id, "b");
        assert_eq!(top[1].id, "d");
        assert_eq!(top[2].id, "a");
        assert_eq!(kpis.users.active, 3);
    }

    #[test]
    fn completeness_uses_the_four_point_checklist() {
        let full = ComplaintRecord {
            description: "buraco grande na pista".to_string(),
            image_url: Some("https://cdn.example/img.jpg".to_string()),
            address: Address {
                street: Some("Rua A".to_string()),
                district: Some("Centro".to_string()),
                city: Some("Imperatriz".to_string()),
                ..Address::default()
            },
            ..ComplaintRecord::default()
        };
        let bare = ComplaintRecord::default();
        let kpis = Kpis::compute(&[], &[full, bare], Utc::now(), 30);
        assert!((kpis.quality.completeness_score - 50.0).abs() < f64::EPSILON);
        assert_eq!(kpis.quality.complaints_with_images, 1);
    }
}
