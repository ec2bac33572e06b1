#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! API request and response types for the civic map server.
//!
//! Every response travels in the [`ApiResponse`] envelope the mobile app
//! expects: `{ success, statuscode, data, message, meta }`. Complaint
//! payloads go through [`ApiComplaint`], which hides the reporter's
//! identity unless the viewer owns the record; the extra owner and viewer
//! fields are flattened in only when they apply, so anonymous readers
//! never see the keys at all.

use chrono::{DateTime, Utc};
use civic_map_complaint_models::{Address, ComplaintRecord, Situation};
use civic_map_geo::Cluster;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The JSON envelope wrapping every API response.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub statuscode: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl<T: Serialize> ApiResponse<T> {
    /// A 200 envelope around `data`.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            statuscode: 200,
            data: Some(data),
            message: None,
            meta: None,
        }
    }

    /// A 200 envelope with response metadata.
    #[must_use]
    pub const fn ok_with_meta(data: T, meta: Value) -> Self {
        Self {
            success: true,
            statuscode: 200,
            data: Some(data),
            message: None,
            meta: Some(meta),
        }
    }

    /// A 201 envelope with a confirmation message.
    #[must_use]
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            statuscode: 201,
            data: Some(data),
            message: Some(message.into()),
            meta: None,
        }
    }
}

impl ApiResponse<Value> {
    /// A failure envelope with no data.
    #[must_use]
    pub fn error(statuscode: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            statuscode,
            data: None,
            message: Some(message.into()),
            meta: None,
        }
    }
}

/// Health-check payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    pub healthy: bool,
    pub version: String,
}

/// Fields revealed only to the complaint's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerExtension {
    pub user_name: String,
    pub user_id: String,
    pub is_owner: bool,
}

/// Capability hints added for any authenticated viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerExtension {
    pub can_edit: bool,
    pub can_report: bool,
}

/// A complaint as the API exposes it.
///
/// The base shape carries no reporter identity. [`Self::for_viewer`]
/// flattens in the owner fields when the viewer owns the record and the
/// capability fields whenever the viewer is authenticated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiComplaint {
    pub id: String,
    pub description: String,
    pub address: Address,
    pub situation: Situation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub similar_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub owner: Option<OwnerExtension>,
    #[serde(flatten)]
    pub viewer: Option<ViewerExtension>,
}

impl ApiComplaint {
    /// The anonymous public view.
    #[must_use]
    pub fn public_view(record: &ComplaintRecord) -> Self {
        Self {
            id: record.id.clone(),
            description: record.description.clone(),
            address: record.address.clone(),
            situation: record.situation,
            image_url: record.image_url.clone(),
            thumbnail_url: record.thumbnail_url.clone(),
            similar_count: record.similar_count,
            created_at: record.created_at,
            updated_at: record.updated_at,
            owner: None,
            viewer: None,
        }
    }

    /// The view for an optionally authenticated request. `viewer_uid` is
    /// the authenticated user's UID, if any.
    #[must_use]
    pub fn for_viewer(record: &ComplaintRecord, viewer_uid: Option<&str>) -> Self {
        let mut view = Self::public_view(record);
        if let Some(uid) = viewer_uid {
            let is_owner = uid == record.user_id;
            if is_owner {
                view.owner = Some(OwnerExtension {
                    user_name: record.user_name.clone(),
                    user_id: record.user_id.clone(),
                    is_owner: true,
                });
            }
            view.viewer = Some(ViewerExtension {
                can_edit: is_owner,
                can_report: !is_owner,
            });
        }
        view
    }

    /// Whether the owner extension is present.
    #[must_use]
    pub const fn is_owner(&self) -> bool {
        self.owner.is_some()
    }
}

/// A complaint paired with its batch-relative relevance score.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevantComplaint {
    #[serde(flatten)]
    pub complaint: ApiComplaint,
    pub relevance_score: u8,
}

/// A complaint paired with its distance from a query point.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyComplaint {
    #[serde(flatten)]
    pub complaint: ApiComplaint,
    /// Great-circle distance in kilometers, rounded to meters.
    pub distance_km: f64,
}

/// Marker coordinates for the map overview.
#[derive(Debug, Clone, Serialize)]
pub struct ComplaintPosition {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Numeric lifecycle status.
    pub status: u8,
}

/// A single weighted point of the heatmap.
#[derive(Debug, Clone, Serialize)]
pub struct HeatmapPoint {
    pub lat: f64,
    pub lng: f64,
    /// Render weight 1-3, heavier for less-handled complaints.
    pub weight: u8,
    pub status: u8,
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
}

/// Three-way status totals (closed complaints are not painted).
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusTotals {
    pub pending: usize,
    #[serde(rename = "progress")]
    pub in_progress: usize,
    pub resolved: usize,
}

/// Per-district totals in the heatmap summary.
#[derive(Debug, Clone, Serialize)]
pub struct DistrictTotals {
    pub district: String,
    pub total: usize,
    #[serde(flatten)]
    pub by_status: StatusTotals,
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// A geographic bounding box.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// Aggregate block of the heatmap payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapSummary {
    pub total: usize,
    pub by_status: StatusTotals,
    pub by_district: Vec<DistrictTotals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<LatLng>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<GeoBounds>,
}

/// The heatmap payload: raw points for high zoom, clusters for low zoom,
/// and summary statistics.
#[derive(Debug, Clone, Serialize)]
pub struct HeatmapData {
    pub points: Vec<HeatmapPoint>,
    pub clusters: Vec<Cluster>,
    pub summary: HeatmapSummary,
}

/// Pagination block reported in `meta` or admin payloads.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl Pagination {
    /// Builds the pagination block for `total` items.
    #[must_use]
    pub const fn new(page: usize, limit: usize, total: usize) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }

    /// The index range of the current page, clipped to `total`.
    ///
    /// `page` comes straight from the query string, so the math saturates
    /// rather than trusting the caller to stay in range.
    #[must_use]
    pub const fn slice_bounds(&self) -> (usize, usize) {
        let start = self.page.saturating_sub(1).saturating_mul(self.limit);
        let start = if start > self.total { self.total } else { start };
        let end = start.saturating_add(self.limit);
        let end = if end > self.total { self.total } else { end };
        (start, end)
    }
}

// --- query parameters ---

/// Query parameters for the heatmap endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct HeatmapParams {
    /// Clustering zoom level 1-15; anything else uses the default radius.
    pub zoom: Option<u8>,
    /// `all`, `pending`, `progress`, or `resolved`.
    pub status: Option<String>,
}

/// Query parameters for the relevant-complaints endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RelevantParams {
    pub limit: Option<usize>,
}

/// Query parameters for the proximity endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProximityParams {
    pub latitude: f64,
    pub longitude: f64,
    /// Search radius in kilometers.
    pub radius: Option<f64>,
    pub limit: Option<usize>,
}

/// Query parameters for the dashboard endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardParams {
    /// `7d`, `30d`, `90d`, or `1y`.
    pub timeframe: Option<String>,
    /// `"true"` to include the detailed breakdowns.
    pub include_details: Option<String>,
}

/// Query parameters for the unified search endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub q: Option<String>,
    /// `users`, `complaints`, or `all`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub limit: Option<usize>,
    pub page: Option<usize>,
    /// `relevance`, `date`, or `alphabetical`.
    pub sort_by: Option<String>,
}

/// Query parameters for suggestions and autocomplete.
#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionParams {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub limit: Option<usize>,
}

/// Query parameters for admin listings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminListParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    /// Listing-specific status filter.
    pub status: Option<String>,
    /// Priority filter for complaint listings.
    pub priority: Option<String>,
    /// `"true"` to keep only flagged complaints.
    pub flagged: Option<String>,
    pub search: Option<String>,
}

/// Query parameters for the audit-log listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    /// `user_action`, `complaint_action`, or `all`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub admin_id: Option<String>,
}

// --- request bodies ---

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub document_number: String,
    #[serde(default)]
    pub phone_number: String,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /complaints`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintRequest {
    pub description: Option<String>,
    pub address: Option<Address>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Body of `PATCH /admin/users/{uid}`.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminUserAction {
    /// `verify`, `unverify`, `suspend`, `unsuspend`, or `delete`.
    pub action: String,
    pub reason: Option<String>,
}

/// Body of `PATCH /admin/complaints/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminComplaintAction {
    /// `update_status`, `flag`, `unflag`, `moderate`, or `delete`.
    pub action: String,
    /// New numeric status for `update_status`.
    pub status: Option<u8>,
    pub reason: Option<String>,
    pub moderation_note: Option<String>,
}

// --- auth responses ---

/// Profile and token returned by the login and register endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub uid: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Bearer token for subsequent requests.
    pub token: String,
}

// --- search responses ---

/// One result of the unified search.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    /// `user` or `complaint`.
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub relevance_score: f64,
    pub url: String,
    /// Kind-specific extra fields.
    pub data: Value,
}

/// Summary block of the unified search response.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSummary {
    pub total: usize,
    pub users: usize,
    pub complaints: usize,
}

/// A typed search suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// `location` or `term`.
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub category: String,
}

/// An autocomplete entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutocompleteItem {
    /// `city`, `district`, or `term`.
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub value: String,
}
