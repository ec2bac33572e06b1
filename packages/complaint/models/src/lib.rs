#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Complaint domain types shared across the civic-map system.
//!
//! Defines the document-shaped record types for the `users`, `complaints`,
//! and `admin_logs` collections, the four-valued complaint lifecycle status,
//! the rule-based priority classifier, and the keyword categorizer. The
//! classifier and categorizer are pure functions over a single record and
//! carry their rules in tables so weights and keywords can be swapped
//! without touching control flow.

mod records;

pub use records::{
    Address, AdminLogKind, AdminLogRecord, ComplaintRecord, ModerationNote, Situation, UserRecord,
};

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumString};

/// Lifecycle status of a complaint, stored on the wire as an integer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ComplaintStatus {
    /// 0: Reported, awaiting triage.
    #[default]
    Pending = 0,
    /// 1: Acknowledged and being worked on.
    InProgress = 1,
    /// 2: Fixed.
    Resolved = 2,
    /// 3: Closed without resolution (duplicate, invalid, out of scope).
    Closed = 3,
}

impl ComplaintStatus {
    /// Returns the numeric wire value of this status.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a status from its numeric wire value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range 0-3.
    pub const fn from_value(value: u8) -> Result<Self, InvalidStatusError> {
        match value {
            0 => Ok(Self::Pending),
            1 => Ok(Self::InProgress),
            2 => Ok(Self::Resolved),
            3 => Ok(Self::Closed),
            _ => Err(InvalidStatusError { value }),
        }
    }
}

impl Serialize for ComplaintStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}

impl<'de> Deserialize<'de> for ComplaintStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        Self::from_value(value).map_err(de::Error::custom)
    }
}

/// Error returned when attempting to create a [`ComplaintStatus`] from an
/// invalid numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidStatusError {
    /// The invalid status value that was provided.
    pub value: u8,
}

impl std::fmt::Display for InvalidStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid status value {}: expected 0-3", self.value)
    }
}

impl std::error::Error for InvalidStatusError {}

/// Urgency classification of a complaint, independent of any batch.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    /// No urgency signals.
    Low = 0,
    /// Some urgency signals (score >= 2).
    Medium = 1,
    /// Strong urgency signals (score >= 4).
    High = 2,
    /// Requires immediate attention (score >= 6).
    Urgent = 3,
}

impl Priority {
    /// Returns the numeric rank of this priority (low = 0 .. urgent = 3),
    /// used as a sub-score by the relevance ranking.
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }
}

/// Keywords that signal urgency when present in a description.
///
/// Case-sensitive substring match, matching the language of the source
/// data. Swap the list to retune the classifier.
pub const ALERT_KEYWORDS: &[&str] = &["urgente", "perigo"];

/// Classifies a complaint's priority from its own fields.
///
/// Points accumulate per rule and thresholds bucket the total: an attached
/// image (+1), more than 3 similar complaints (+2), an alert keyword in the
/// description (+3), open for more than 30 days (+2), open for more than
/// 90 days (+3 more). Deterministic and monotonic: adding a signal never
/// lowers the bucket.
#[must_use]
pub fn classify(complaint: &ComplaintRecord, now: DateTime<Utc>) -> Priority {
    let mut score = 0u8;

    if complaint.image_url.is_some() {
        score += 1;
    }
    if complaint.similar_count > 3 {
        score += 2;
    }
    if ALERT_KEYWORDS
        .iter()
        .any(|kw| complaint.description.contains(kw))
    {
        score += 3;
    }
    if let Some(created_at) = complaint.created_at {
        let days_open = (now - created_at).num_days().max(0);
        if days_open > 30 {
            score += 2;
        }
        if days_open > 90 {
            score += 3;
        }
    }

    if score >= 6 {
        Priority::Urgent
    } else if score >= 4 {
        Priority::High
    } else if score >= 2 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Category of a complaint, derived from its description.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum Category {
    /// Road surface problems (potholes, broken asphalt).
    Infrastructure,
    /// Street lighting problems.
    #[strum(serialize = "Public Lighting")]
    #[serde(rename = "Public Lighting")]
    PublicLighting,
    /// Garbage and rubble accumulation.
    #[strum(serialize = "Urban Cleaning")]
    #[serde(rename = "Urban Cleaning")]
    UrbanCleaning,
    /// Sewage and water supply problems.
    Sanitation,
    /// Sidewalk and mobility problems.
    Accessibility,
    /// Trees and green areas.
    Environment,
    /// No keyword matched.
    Other,
}

/// Ordered keyword table for [`categorize`]. First match wins, so the
/// order is part of the contract.
const CATEGORY_KEYWORDS: &[(&str, Category)] = &[
    ("buraco", Category::Infrastructure),
    ("asfalto", Category::Infrastructure),
    ("iluminação", Category::PublicLighting),
    ("lâmpada", Category::PublicLighting),
    ("lixo", Category::UrbanCleaning),
    ("entulho", Category::UrbanCleaning),
    ("esgoto", Category::Sanitation),
    ("água", Category::Sanitation),
    ("calçada", Category::Accessibility),
    ("árvore", Category::Environment),
];

/// Derives a complaint category from its description.
///
/// Case-insensitive substring match against the ordered keyword table;
/// returns [`Category::Other`] when nothing matches.
#[must_use]
pub fn categorize(description: &str) -> Category {
    let desc = description.to_lowercase();
    for (keyword, category) in CATEGORY_KEYWORDS {
        if desc.contains(keyword) {
            return *category;
        }
    }
    Category::Other
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn complaint(description: &str) -> ComplaintRecord {
        ComplaintRecord {
            description: description.to_string(),
            ..ComplaintRecord::default()
        }
    }

    #[test]
    fn status_roundtrip() {
        for value in 0..=3 {
            let status = ComplaintStatus::from_value(value).unwrap();
            assert_eq!(status.value(), value);
        }
        assert!(ComplaintStatus::from_value(4).is_err());
    }

    #[test]
    fn status_serializes_as_integer() {
        let json = serde_json::to_string(&ComplaintStatus::InProgress).unwrap();
        assert_eq!(json, "1");
        let status: ComplaintStatus = serde_json::from_str("2").unwrap();
        assert_eq!(status, ComplaintStatus::Resolved);
    }

    #[test]
    fn fresh_benign_complaint_is_low() {
        let now = Utc::now();
        let mut c = complaint("árvore caída na praça");
        c.created_at = Some(now);
        assert_eq!(classify(&c, now), Priority::Low);
    }

    #[test]
    fn stacked_signals_reach_urgent() {
        // image (1) + similar (2) + keyword (3) + 30d (2) + 90d (3) = 11
        let now = Utc::now();
        let mut c = complaint("buraco com perigo para pedestres");
        c.image_url = Some("https://cdn.example/img.jpg".to_string());
        c.similar_count = 10;
        c.created_at = Some(now - Duration::days(100));
        assert_eq!(classify(&c, now), Priority::Urgent);
    }

    #[test]
    fn keyword_alone_is_medium() {
        let now = Utc::now();
        let mut c = complaint("situação de perigo na esquina");
        c.created_at = Some(now);
        assert_eq!(classify(&c, now), Priority::Medium);
    }

    #[test]
    fn alert_keywords_are_case_sensitive() {
        let now = Utc::now();
        let mut c = complaint("URGENTE: poste caído");
        c.created_at = Some(now);
        assert_eq!(classify(&c, now), Priority::Low);
    }

    #[test]
    fn classify_is_monotonic_per_factor() {
        let now = Utc::now();
        let mut base = complaint("calçada quebrada");
        base.created_at = Some(now);
        let baseline = classify(&base, now);

        let mut with_image = base.clone();
        with_image.image_url = Some("https://cdn.example/img.jpg".to_string());
        assert!(classify(&with_image, now) >= baseline);

        let mut with_similar = base.clone();
        with_similar.similar_count = 4;
        assert!(classify(&with_similar, now) >= baseline);

        let mut with_keyword = base.clone();
        with_keyword.description.push_str(" urgente");
        assert!(classify(&with_keyword, now) >= baseline);

        let mut older = base.clone();
        older.created_at = Some(now - Duration::days(40));
        assert!(classify(&older, now) >= baseline);
    }

    #[test]
    fn missing_created_at_earns_no_age_points() {
        let now = Utc::now();
        let c = complaint("entulho na rua");
        assert!(c.created_at.is_none());
        // keyword-free, image-free: only the (absent) age rules could fire
        assert_eq!(classify(&c, now), Priority::Low);
    }

    #[test]
    fn categorize_first_match_wins() {
        // "buraco" appears before "asfalto" in the table
        assert_eq!(
            categorize("asfalto afundou e abriu um buraco"),
            Category::Infrastructure
        );
        assert_eq!(categorize("lâmpada queimada"), Category::PublicLighting);
        assert_eq!(categorize("esgoto a céu aberto"), Category::Sanitation);
        assert_eq!(categorize("LIXO acumulado"), Category::UrbanCleaning);
        assert_eq!(categorize("nada a ver"), Category::Other);
    }

    #[test]
    fn category_display_labels() {
        assert_eq!(Category::PublicLighting.to_string(), "Public Lighting");
        assert_eq!(Category::Other.to_string(), "Other");
    }
}
