//! Document-shaped record types for the `users`, `complaints`, and
//! `admin_logs` collections.
//!
//! Field names mirror the documents as they exist in the store (camelCase),
//! with aliases where the historical data used snake_case. Decoding is
//! lenient: optional and defaulted fields keep a partially filled document
//! from sinking a whole snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ComplaintStatus;

/// Street address and coordinates attached to a complaint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Street name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    /// Neighborhood / district name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    /// City name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// State name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Free-form place name used when the structured fields are missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_name: Option<String>,
    /// Latitude in degrees; absent when the report carried no location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude in degrees; absent when the report carried no location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// Lifecycle wrapper stored on each complaint document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Situation {
    /// Current lifecycle status.
    #[serde(default)]
    pub status: ComplaintStatus,
}

/// A moderation note appended by an administrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationNote {
    /// Note text.
    pub note: String,
    /// UID of the administrator who wrote the note.
    pub admin_id: String,
    /// Display name of the administrator.
    pub admin_name: String,
    /// When the note was written.
    pub timestamp: DateTime<Utc>,
}

/// A citizen-submitted complaint as stored in the `complaints` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintRecord {
    /// Document ID.
    #[serde(default)]
    pub id: String,
    /// Free-text description of the problem.
    #[serde(default)]
    pub description: String,
    /// Where the problem is.
    #[serde(default)]
    pub address: Address,
    /// Lifecycle status.
    #[serde(default)]
    pub situation: Situation,
    /// URL of the attached photo, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// URL of the photo thumbnail, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Number of similar complaints merged into this one.
    #[serde(default)]
    pub similar_count: u32,
    /// Whether a moderator flagged this complaint.
    #[serde(default)]
    pub flagged: bool,
    /// Soft-delete marker set by administrative actions.
    #[serde(default)]
    pub deleted: bool,
    /// Moderation notes, newest last.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub moderation_notes: Vec<ModerationNote>,
    /// Timestamp of the last moderation action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_moderated: Option<DateTime<Utc>>,
    /// UID of the reporting user.
    #[serde(default)]
    pub user_id: String,
    /// Display name of the reporting user (denormalized).
    #[serde(default)]
    pub user_name: String,
    /// When the complaint was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the complaint was last updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ComplaintRecord {
    /// Returns the coordinates if both are present and usable: finite and
    /// within the valid latitude/longitude ranges.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.address.latitude?;
        let lng = self.address.longitude?;
        if lat.is_finite() && lng.is_finite() && lat.abs() <= 90.0 && lng.abs() <= 180.0 {
            Some((lat, lng))
        } else {
            None
        }
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> ComplaintStatus {
        self.situation.status
    }
}

/// A registered citizen as stored in the `users` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Identity-provider UID (also the document ID).
    #[serde(default, alias = "id")]
    pub uid: String,
    /// Full name.
    #[serde(default)]
    pub full_name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// National document number.
    #[serde(default)]
    pub document_number: String,
    /// Phone number.
    #[serde(default)]
    pub phone_number: String,
    /// Profile photo URL.
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Whether the account has been verified by an administrator.
    #[serde(default)]
    pub verified: bool,
    /// Whether the account is suspended.
    #[serde(default)]
    pub suspended: bool,
    /// Soft-delete marker set by administrative actions.
    #[serde(default)]
    pub deleted: bool,
    /// Number of complaints submitted (denormalized counter).
    #[serde(default)]
    pub complaints_count: u32,
    /// When the account was created. Historical documents used snake_case.
    #[serde(
        default,
        alias = "created_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// When the account was last updated.
    #[serde(
        default,
        alias = "updated_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Kind of audited administrative action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminLogKind {
    /// Action targeting a user account.
    UserAction,
    /// Action targeting a complaint.
    ComplaintAction,
}

/// An audit-trail entry in the `admin_logs` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogRecord {
    /// Document ID.
    #[serde(default)]
    pub id: String,
    /// What kind of target the action applied to.
    #[serde(rename = "type")]
    pub kind: AdminLogKind,
    /// Action name (verify, suspend, update_status, flag, ...).
    pub action: String,
    /// Target user UID for user actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<String>,
    /// Target complaint ID for complaint actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_complaint_id: Option<String>,
    /// UID of the administrator who acted.
    pub admin_id: String,
    /// Display name of the administrator.
    pub admin_name: String,
    /// Stated reason for the action.
    pub reason: String,
    /// New status for `update_status` actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_status: Option<u8>,
    /// Moderation note for `moderate` actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderation_note: Option<String>,
    /// When the action was taken.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_require_both_fields() {
        let mut c = ComplaintRecord::default();
        assert_eq!(c.coordinates(), None);

        c.address.latitude = Some(-5.52);
        assert_eq!(c.coordinates(), None);

        c.address.longitude = Some(-47.48);
        assert_eq!(c.coordinates(), Some((-5.52, -47.48)));
    }

    #[test]
    fn coordinates_reject_out_of_range() {
        let mut c = ComplaintRecord::default();
        c.address.latitude = Some(91.0);
        c.address.longitude = Some(0.0);
        assert_eq!(c.coordinates(), None);

        c.address.latitude = Some(f64::NAN);
        assert_eq!(c.coordinates(), None);

        c.address.latitude = Some(0.0);
        c.address.longitude = Some(f64::INFINITY);
        assert_eq!(c.coordinates(), None);
    }

    #[test]
    fn complaint_decodes_from_partial_document() {
        let doc = serde_json::json!({
            "description": "buraco na rua",
            "address": { "city": "Imperatriz", "latitude": -5.52, "longitude": -47.48 },
            "situation": { "status": 1 },
            "similarCount": 2
        });
        let c: ComplaintRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(c.status(), ComplaintStatus::InProgress);
        assert_eq!(c.similar_count, 2);
        assert!(c.coordinates().is_some());
        assert!(!c.flagged);
    }

    #[test]
    fn user_accepts_snake_case_created_at() {
        let doc = serde_json::json!({
            "uid": "u1",
            "fullName": "Maria",
            "email": "maria@example.com",
            "created_at": "2024-03-01T12:00:00Z"
        });
        let u: UserRecord = serde_json::from_value(doc).unwrap();
        assert!(u.created_at.is_some());
        assert_eq!(u.full_name, "Maria");
    }

    #[test]
    fn admin_log_kind_uses_type_field() {
        let log = AdminLogRecord {
            id: String::new(),
            kind: AdminLogKind::UserAction,
            action: "verify".to_string(),
            target_user_id: Some("u1".to_string()),
            target_complaint_id: None,
            admin_id: "a1".to_string(),
            admin_name: "Admin".to_string(),
            reason: "manual check".to_string(),
            new_status: None,
            moderation_note: None,
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(value["type"], "user_action");
    }
}
