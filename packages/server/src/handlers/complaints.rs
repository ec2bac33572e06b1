//! Complaint handlers: listing, submission, and the map feeds.

use actix_web::{HttpRequest, HttpResponse, http::StatusCode, web};
use chrono::Utc;
use civic_map_complaint_models::{ComplaintRecord, ComplaintStatus};
use civic_map_geo::{DEFAULT_RADIUS_KM, cluster, nearby, rank};
use civic_map_server_models::{
    ApiComplaint, ApiResponse, ComplaintPosition, CreateComplaintRequest, DistrictTotals,
    GeoBounds, HeatmapData, HeatmapParams, HeatmapPoint, HeatmapSummary, LatLng, NearbyComplaint,
    ProximityParams, RelevantComplaint, RelevantParams, StatusTotals,
};
use serde_json::json;

use crate::AppState;
use crate::handlers::{
    COMPLAINTS, USERS, authenticate, load_complaints, optional_user, respond_error, store_failure,
};

/// Most records a listing response carries.
const LIST_LIMIT: usize = 100;

/// Most records the map feeds consider in one snapshot.
const GEO_SNAPSHOT_LIMIT: usize = 500;

/// Default and maximum sizes of the relevance feed.
const RELEVANT_DEFAULT: usize = 20;
const RELEVANT_MAX: usize = 100;

/// Default size of the proximity feed.
const PROXIMITY_DEFAULT: usize = 20;

/// Complaints the public API should surface, newest first.
fn visible(mut complaints: Vec<ComplaintRecord>) -> Vec<ComplaintRecord> {
    complaints.retain(|c| !c.deleted);
    complaints.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    complaints
}

/// `GET /api/v1/complaints`
///
/// Public listing, newest first. Authenticated callers get the owner
/// extension on their own records.
pub async fn list(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let viewer = optional_user(&state, &req).await;

    let mut complaints = match load_complaints(&state).await {
        Ok(complaints) => visible(complaints),
        Err(err) => return store_failure("Failed to list complaints", &err),
    };
    if complaints.is_empty() {
        return respond_error(StatusCode::NOT_FOUND, "No complaints found");
    }
    complaints.truncate(LIST_LIMIT);

    let uid = viewer.as_ref().map(|u| u.uid.as_str());
    let views: Vec<ApiComplaint> = complaints
        .iter()
        .map(|c| ApiComplaint::for_viewer(c, uid))
        .collect();

    HttpResponse::Ok().json(ApiResponse::ok_with_meta(
        views,
        json!({ "total": complaints.len() }),
    ))
}

/// `POST /api/v1/complaints`
///
/// Registers a complaint for the authenticated citizen and bumps their
/// complaint counter.
pub async fn create(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateComplaintRequest>,
) -> HttpResponse {
    let auth = match authenticate(&state, &req).await {
        Ok(auth) => auth,
        Err(resp) => return resp,
    };

    let body = body.into_inner();
    let (Some(description), Some(address)) = (body.description, body.address) else {
        return respond_error(
            StatusCode::BAD_REQUEST,
            "description and address are required",
        );
    };
    if description.trim().is_empty() {
        return respond_error(
            StatusCode::BAD_REQUEST,
            "description and address are required",
        );
    }

    let now = Utc::now();
    let record = ComplaintRecord {
        description,
        address,
        image_url: body.image_url,
        thumbnail_url: body.thumbnail_url,
        user_id: auth.uid.clone(),
        user_name: auth.email.clone(),
        created_at: Some(now),
        updated_at: Some(now),
        ..ComplaintRecord::default()
    };

    let mut data = match serde_json::to_value(&record) {
        Ok(data) => data,
        Err(err) => {
            log::error!("Failed to encode complaint: {err}");
            return respond_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };
    // The store assigns the document ID; an empty one must not shadow it.
    if let Some(map) = data.as_object_mut() {
        map.remove("id");
    }
    let doc = match state.store.insert(COMPLAINTS, data).await {
        Ok(doc) => doc,
        Err(err) => return store_failure("Failed to store complaint", &err),
    };

    bump_complaints_count(&state, &auth.uid).await;

    let stored = ComplaintRecord {
        id: doc.id,
        ..record
    };
    HttpResponse::Created().json(ApiResponse::created(
        ApiComplaint::for_viewer(&stored, Some(&auth.uid)),
        "Complaint registered successfully",
    ))
}

/// Bumps the denormalized complaint counter on the reporter's profile.
/// Failures are logged, not surfaced: the complaint itself is stored.
async fn bump_complaints_count(state: &AppState, uid: &str) {
    let count = match state.store.get(USERS, uid).await {
        Ok(Some(doc)) => doc
            .data
            .get("complaintsCount")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0),
        Ok(None) => {
            log::warn!("No profile document for reporter {uid}");
            return;
        }
        Err(err) => {
            log::warn!("Failed to load reporter profile {uid}: {err}");
            return;
        }
    };

    let patch = json!({ "complaintsCount": count + 1, "updatedAt": Utc::now() });
    if let Err(err) = state.store.update(USERS, uid, patch).await {
        log::warn!("Failed to bump complaint counter for {uid}: {err}");
    }
}

/// `GET /api/v1/complaints/positions`
///
/// Lightweight marker feed: ID, coordinates, and status for every
/// complaint that carries a usable location.
pub async fn positions(state: web::Data<AppState>) -> HttpResponse {
    let complaints = match load_complaints(&state).await {
        Ok(complaints) => visible(complaints),
        Err(err) => return store_failure("Failed to list complaint positions", &err),
    };

    let positions: Vec<ComplaintPosition> = complaints
        .iter()
        .filter_map(|c| {
            let (latitude, longitude) = c.coordinates()?;
            Some(ComplaintPosition {
                id: c.id.clone(),
                latitude,
                longitude,
                status: c.status().value(),
            })
        })
        .collect();

    HttpResponse::Ok().json(ApiResponse::ok_with_meta(
        positions,
        json!({ "total": complaints.len() }),
    ))
}

fn status_filter(label: &str) -> Option<ComplaintStatus> {
    match label {
        "pending" => Some(ComplaintStatus::Pending),
        "progress" => Some(ComplaintStatus::InProgress),
        "resolved" => Some(ComplaintStatus::Resolved),
        _ => None,
    }
}

const fn point_weight(status: ComplaintStatus) -> u8 {
    match status {
        ComplaintStatus::Pending => 3,
        ComplaintStatus::InProgress => 2,
        ComplaintStatus::Resolved | ComplaintStatus::Closed => 1,
    }
}

/// `GET /api/v1/complaints/heatmap`
///
/// The map overview: weighted points, zoom-dependent clusters, and a
/// summary block. Pending complaints paint heavier than handled ones.
pub async fn heatmap(
    state: web::Data<AppState>,
    params: web::Query<HeatmapParams>,
) -> HttpResponse {
    let complaints = match load_complaints(&state).await {
        Ok(complaints) => visible(complaints),
        Err(err) => return store_failure("Failed to build heatmap", &err),
    };

    let wanted = params.status.as_deref().and_then(status_filter);
    let mut located: Vec<ComplaintRecord> = complaints
        .into_iter()
        .filter(|c| c.coordinates().is_some())
        .filter(|c| wanted.is_none_or(|status| c.status() == status))
        .collect();
    located.truncate(GEO_SNAPSHOT_LIMIT);

    let zoom = params.zoom.unwrap_or(10);
    let clusters = cluster(&located, zoom);

    let points: Vec<HeatmapPoint> = located
        .iter()
        .filter_map(|c| {
            let (lat, lng) = c.coordinates()?;
            Some(HeatmapPoint {
                lat,
                lng,
                weight: point_weight(c.status()),
                status: c.status().value(),
                id: c.id.clone(),
                title: c.description.clone(),
                district: c.address.district.clone(),
            })
        })
        .collect();

    let mut by_status = StatusTotals::default();
    for c in &located {
        match c.status() {
            ComplaintStatus::Pending => by_status.pending += 1,
            ComplaintStatus::InProgress => by_status.in_progress += 1,
            ComplaintStatus::Resolved => by_status.resolved += 1,
            ComplaintStatus::Closed => {}
        }
    }

    let total = located.len();
    let data = HeatmapData {
        summary: HeatmapSummary {
            total,
            by_status,
            by_district: district_totals(&located),
            center: center_of(&points),
            bounds: bounds_of(&points),
        },
        points,
        clusters,
    };

    HttpResponse::Ok().json(ApiResponse::ok_with_meta(
        data,
        json!({
            "total": total,
            "generated_at": Utc::now(),
            "zoom_level": zoom,
            "filtered_by": params.status.as_deref().unwrap_or("all"),
        }),
    ))
}

fn district_totals(complaints: &[ComplaintRecord]) -> Vec<DistrictTotals> {
    let mut by_district = std::collections::BTreeMap::<String, (usize, StatusTotals)>::new();
    for c in complaints {
        let district = c
            .address
            .district
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let entry = by_district.entry(district).or_default();
        entry.0 += 1;
        match c.status() {
            ComplaintStatus::Pending => entry.1.pending += 1,
            ComplaintStatus::InProgress => entry.1.in_progress += 1,
            ComplaintStatus::Resolved => entry.1.resolved += 1,
            ComplaintStatus::Closed => {}
        }
    }

    let mut totals: Vec<DistrictTotals> = by_district
        .into_iter()
        .map(|(district, (total, by_status))| DistrictTotals {
            district,
            total,
            by_status,
        })
        .collect();
    totals.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.district.cmp(&b.district)));
    totals
}

fn center_of(points: &[HeatmapPoint]) -> Option<LatLng> {
    if points.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let count = points.len() as f64;
    Some(LatLng {
        lat: points.iter().map(|p| p.lat).sum::<f64>() / count,
        lng: points.iter().map(|p| p.lng).sum::<f64>() / count,
    })
}

fn bounds_of(points: &[HeatmapPoint]) -> Option<GeoBounds> {
    let first = points.first()?;
    let mut bounds = GeoBounds {
        north: first.lat,
        south: first.lat,
        east: first.lng,
        west: first.lng,
    };
    for p in &points[1..] {
        bounds.north = bounds.north.max(p.lat);
        bounds.south = bounds.south.min(p.lat);
        bounds.east = bounds.east.max(p.lng);
        bounds.west = bounds.west.min(p.lng);
    }
    Some(bounds)
}

/// `GET /api/v1/complaints/relevant`
///
/// Complaints ranked by batch-relative relevance, most relevant first.
pub async fn relevant(
    state: web::Data<AppState>,
    params: web::Query<RelevantParams>,
) -> HttpResponse {
    let complaints = match load_complaints(&state).await {
        Ok(complaints) => visible(complaints),
        Err(err) => return store_failure("Failed to rank complaints", &err),
    };

    let limit = params.limit.unwrap_or(RELEVANT_DEFAULT).min(RELEVANT_MAX);
    let ranked: Vec<RelevantComplaint> = rank(&complaints, Utc::now(), limit)
        .into_iter()
        .map(|scored| RelevantComplaint {
            complaint: ApiComplaint::public_view(&scored.complaint),
            relevance_score: scored.relevance_score,
        })
        .collect();

    HttpResponse::Ok().json(ApiResponse::ok_with_meta(
        ranked,
        json!({ "total": complaints.len(), "limit": limit }),
    ))
}

/// `GET /api/v1/complaints/proximity`
///
/// Complaints within a radius of a point, nearest first.
pub async fn proximity(
    state: web::Data<AppState>,
    params: web::Query<ProximityParams>,
) -> HttpResponse {
    if params.latitude.abs() > 90.0
        || params.longitude.abs() > 180.0
        || !params.latitude.is_finite()
        || !params.longitude.is_finite()
    {
        return respond_error(StatusCode::BAD_REQUEST, "Invalid coordinates");
    }

    let complaints = match load_complaints(&state).await {
        Ok(complaints) => visible(complaints),
        Err(err) => return store_failure("Failed to search by proximity", &err),
    };

    let radius = params
        .radius
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or(DEFAULT_RADIUS_KM);
    let limit = params.limit.unwrap_or(PROXIMITY_DEFAULT);

    let matches: Vec<NearbyComplaint> = nearby(&complaints, params.latitude, params.longitude, radius)
        .into_iter()
        .take(limit)
        .map(|(record, distance)| NearbyComplaint {
            complaint: ApiComplaint::public_view(&record),
            distance_km: (distance * 1000.0).round() / 1000.0,
        })
        .collect();

    HttpResponse::Ok().json(ApiResponse::ok_with_meta(
        matches,
        json!({ "radius_km": radius, "limit": limit }),
    ))
}

/// Normalizes a district name for comparison: lowercase, no whitespace.
fn normalize_district(district: &str) -> String {
    district
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// `GET /api/v1/complaints/district/{district}`
///
/// Complaints within a district, matched loosely on the district name.
pub async fn by_district(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let wanted = normalize_district(&path);
    if wanted.is_empty() {
        return respond_error(StatusCode::BAD_REQUEST, "District name is required");
    }

    let complaints = match load_complaints(&state).await {
        Ok(complaints) => visible(complaints),
        Err(err) => return store_failure("Failed to list district complaints", &err),
    };

    let views: Vec<ApiComplaint> = complaints
        .iter()
        .filter(|c| {
            c.address
                .district
                .as_deref()
                .is_some_and(|d| normalize_district(d) == wanted)
        })
        .map(ApiComplaint::public_view)
        .collect();

    if views.is_empty() {
        return respond_error(StatusCode::NOT_FOUND, "No complaints found in this district");
    }

    let total = views.len();
    HttpResponse::Ok().json(ApiResponse::ok_with_meta(
        views,
        json!({ "district": path.as_str(), "total": total }),
    ))
}

/// `GET /api/v1/complaints/{id}`
///
/// Single complaint. Owners see their identity fields, any authenticated
/// viewer sees the capability flags.
pub async fn detail(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> HttpResponse {
    let viewer = optional_user(&state, &req).await;

    let record: ComplaintRecord = match state.store.get(COMPLAINTS, &path).await {
        Ok(Some(doc)) => match doc.decode() {
            Ok(record) => record,
            Err(err) => {
                log::warn!("Malformed complaint document {}: {err}", doc.id);
                return respond_error(StatusCode::NOT_FOUND, "Complaint not found");
            }
        },
        Ok(None) => return respond_error(StatusCode::NOT_FOUND, "Complaint not found"),
        Err(err) => return store_failure("Failed to load complaint", &err),
    };
    if record.deleted {
        return respond_error(StatusCode::NOT_FOUND, "Complaint not found");
    }

    let uid = viewer.as_ref().map(|u| u.uid.as_str());
    HttpResponse::Ok().json(ApiResponse::ok(ApiComplaint::for_viewer(&record, uid)))
}
