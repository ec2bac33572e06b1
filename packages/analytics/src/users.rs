//! User-base statistics endpoint payload.

use chrono::{DateTime, Duration, Utc};
use civic_map_complaint_models::{ComplaintRecord, UserRecord};
use serde::Serialize;

use crate::{percent, start_of_day, top_counts};

/// Headline counts over the whole user base.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOverview {
    pub total_users: usize,
    pub verified_users: usize,
    pub unverified_users: usize,
    /// Share of verified users, percentage.
    pub verification_rate: f64,
}

/// Sign-up counts over recent windows.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGrowth {
    pub last30_days: usize,
    pub last7_days: usize,
    pub today: usize,
}

/// A location ranked by complaint volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedPlace {
    pub name: String,
    pub count: usize,
}

/// Where the user base reports from. Users carry no address of their
/// own, so this is derived from the complaints they filed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDemographics {
    pub top_cities: Vec<RankedPlace>,
    pub top_districts: Vec<RankedPlace>,
}

/// The user-statistics payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatistics {
    pub overview: UserOverview,
    pub growth: UserGrowth,
    pub demographics: UserDemographics,
}

impl UserStatistics {
    /// Computes statistics over the user and complaint snapshots.
    #[must_use]
    pub fn compute(
        users: &[UserRecord],
        complaints: &[ComplaintRecord],
        now: DateTime<Utc>,
    ) -> Self {
        let verified = users.iter().filter(|u| u.verified).count();

        let since = |cutoff: DateTime<Utc>| {
            users
                .iter()
                .filter(|u| u.created_at.is_some_and(|at| at >= cutoff))
                .count()
        };

        Self {
            overview: UserOverview {
                total_users: users.len(),
                verified_users: verified,
                unverified_users: users.len() - verified,
                verification_rate: percent(verified, users.len()),
            },
            growth: UserGrowth {
                last30_days: since(now - Duration::days(30)),
                last7_days: since(now - Duration::days(7)),
                today: since(start_of_day(now)),
            },
            demographics: UserDemographics {
                top_cities: ranked(complaints.iter().map(|c| c.address.city.as_deref())),
                top_districts: ranked(complaints.iter().map(|c| c.address.district.as_deref())),
            },
        }
    }
}

fn ranked<'a, I>(labels: I) -> Vec<RankedPlace>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    top_counts(labels, 10)
        .into_iter()
        .map(|(name, count)| RankedPlace { name, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_map_complaint_models::Address;

    #[test]
    fn overview_splits_verified_and_not() {
        let now = Utc::now();
        let users = vec![
            UserRecord {
                verified: true,
                created_at: Some(now),
                ..UserRecord::default()
            },
            UserRecord {
                created_at: Some(now - Duration::days(10)),
                ..UserRecord::default()
            },
        ];
        let stats = UserStatistics::compute(&users, &[], now);
        assert_eq!(stats.overview.verified_users, 1);
        assert_eq!(stats.overview.unverified_users, 1);
        assert!((stats.overview.verification_rate - 50.0).abs() < f64::EPSILON);
        assert_eq!(stats.growth.today, 1);
        assert_eq!(stats.growth.last30_days, 2);
    }

    #[test]
    fn demographics_come_from_complaint_addresses() {
        let complaints = vec![
            ComplaintRecord {
                address: Address {
                    city: Some("Imperatriz".to_string()),
                    district: Some("Centro".to_string()),
                    ..Address::default()
                },
                ..ComplaintRecord::default()
            },
            ComplaintRecord {
                address: Address {
                    city: Some("Imperatriz".to_string()),
                    ..Address::default()
                },
                ..ComplaintRecord::default()
            },
        ];
        let stats = UserStatistics::compute(&[], &complaints, Utc::now());
        assert_eq!(stats.demographics.top_cities[0].name, "Imperatriz");
        assert_eq!(stats.demographics.top_cities[0].count, 2);
        assert_eq!(stats.demographics.top_districts.len(), 2);
    }
}
