//! HTTP handler functions for the civic map API.
//!
//! Handlers fetch collection snapshots from the document store, run the
//! domain logic over them in memory, and wrap the result in the response
//! envelope. Shared plumbing lives here: bearer-token authentication, the
//! admin gate, snapshot loading, and envelope-shaped error responses.

pub mod admin;
pub mod auth;
pub mod complaints;
pub mod dashboard;
pub mod search;
pub mod users;

use actix_web::{HttpRequest, HttpResponse, http::StatusCode};
use civic_map_auth::{AuthUser, parse_bearer};
use civic_map_complaint_models::{AdminLogRecord, ComplaintRecord, UserRecord};
use civic_map_server_models::{ApiHealth, ApiResponse};
use civic_map_store::StoreError;

use crate::AppState;

/// Collection holding registered citizens.
pub const USERS: &str = "users";
/// Collection holding complaint documents.
pub const COMPLAINTS: &str = "complaints";
/// Collection holding the administrative audit trail.
pub const ADMIN_LOGS: &str = "admin_logs";

/// Complaint count at which a verified account gains admin rights.
pub const ADMIN_COMPLAINT_THRESHOLD: u32 = 5;

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// An envelope-shaped error response with the given status.
#[must_use]
pub fn respond_error(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse::error(status.as_u16(), message))
}

/// Logs a failed store call and returns the opaque 500 envelope.
#[must_use]
pub fn store_failure(context: &str, err: &StoreError) -> HttpResponse {
    log::error!("{context}: {err}");
    respond_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Resolves the request's bearer token to an identity, or `None` when the
/// header is absent or does not verify.
pub async fn optional_user(state: &AppState, req: &HttpRequest) -> Option<AuthUser> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    let token = parse_bearer(header)?;
    match state.identity.verify_token(token).await {
        Ok(user) => Some(user),
        Err(err) => {
            log::debug!("Token rejected: {err}");
            None
        }
    }
}

/// Resolves the request's bearer token, or fails with a 401 envelope.
///
/// # Errors
///
/// Returns the ready-to-send 401 response when the header is missing,
/// malformed, or the token does not verify.
pub async fn authenticate(state: &AppState, req: &HttpRequest) -> Result<AuthUser, HttpResponse> {
    optional_user(state, req).await.ok_or_else(|| {
        respond_error(
            StatusCode::UNAUTHORIZED,
            "Authentication token missing or invalid",
        )
    })
}

/// Authenticates the request and checks the caller holds admin rights:
/// a verified account with enough accepted complaints.
///
/// # Errors
///
/// Returns a 401 envelope when unauthenticated and a 403 envelope when
/// authenticated but not an admin.
pub async fn require_admin(state: &AppState, req: &HttpRequest) -> Result<UserRecord, HttpResponse> {
    let auth = authenticate(state, req).await?;

    let doc = state
        .store
        .get(USERS, &auth.uid)
        .await
        .map_err(|err| store_failure("Failed to load admin profile", &err))?;

    let user: Option<UserRecord> = doc.and_then(|doc| match doc.decode() {
        Ok(user) => Some(user),
        Err(err) => {
            log::warn!("Malformed user document {}: {err}", auth.uid);
            None
        }
    });

    match user {
        Some(user) if is_admin(&user) => Ok(user),
        _ => Err(respond_error(
            StatusCode::FORBIDDEN,
            "Admin privileges required",
        )),
    }
}

/// Whether an account holds admin rights.
#[must_use]
pub fn is_admin(user: &UserRecord) -> bool {
    user.verified && !user.suspended && !user.deleted
        && user.complaints_count >= ADMIN_COMPLAINT_THRESHOLD
}

/// Fetches and decodes the complaints snapshot. Malformed documents are
/// logged and skipped so one bad record cannot take down an endpoint.
///
/// # Errors
///
/// Fails only when the store itself does.
pub async fn load_complaints(state: &AppState) -> Result<Vec<ComplaintRecord>, StoreError> {
    let docs = state.store.list(COMPLAINTS).await?;
    Ok(docs
        .iter()
        .filter_map(|doc| match doc.decode::<ComplaintRecord>() {
            Ok(record) => Some(record),
            Err(err) => {
                log::warn!("Malformed complaint document {}: {err}", doc.id);
                None
            }
        })
        .collect())
}

/// Fetches and decodes the users snapshot, skipping malformed documents.
///
/// # Errors
///
/// Fails only when the store itself does.
pub async fn load_users(state: &AppState) -> Result<Vec<UserRecord>, StoreError> {
    let docs = state.store.list(USERS).await?;
    Ok(docs
        .iter()
        .filter_map(|doc| match doc.decode::<UserRecord>() {
            Ok(record) => Some(record),
            Err(err) => {
                log::warn!("Malformed user document {}: {err}", doc.id);
                None
            }
        })
        .collect())
}

/// Fetches and decodes the audit trail, skipping malformed documents.
///
/// # Errors
///
/// Fails only when the store itself does.
pub async fn load_admin_logs(state: &AppState) -> Result<Vec<AdminLogRecord>, StoreError> {
    let docs = state.store.list(ADMIN_LOGS).await?;
    Ok(docs
        .iter()
        .filter_map(|doc| match doc.decode::<AdminLogRecord>() {
            Ok(record) => Some(record),
            Err(err) => {
                log::warn!("Malformed admin log document {}: {err}", doc.id);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test, web};
    use chrono::{Duration, Utc};
    use civic_map_auth::StaticIdentity;
    use civic_map_store::{DocumentStore, MemoryStore};
    use serde_json::{Value, json};

    use crate::AppState;

    const TOKEN_CITIZEN: &str = "token-citizen";
    const TOKEN_ADMIN: &str = "token-admin";
    const TOKEN_OTHER: &str = "token-other";

    async fn seeded_state() -> web::Data<AppState> {
        let store = MemoryStore::new();
        let now = Utc::now();

        store
            .set(
                super::USERS,
                "u1",
                json!({
                    "uid": "u1",
                    "fullName": "Maria Silva",
                    "email": "maria@example.com",
                    "complaintsCount": 1,
                    "createdAt": now,
                }),
            )
            .await
            .unwrap();
        store
            .set(
                super::USERS,
                "a1",
                json!({
                    "uid": "a1",
                    "fullName": "Ana Costa",
                    "email": "ana@example.com",
                    "verified": true,
                    "complaintsCount": 6,
                    "createdAt": now - Duration::days(90),
                }),
            )
            .await
            .unwrap();
        store
            .set(
                super::USERS,
                "u2",
                json!({
                    "uid": "u2",
                    "fullName": "Pedro Lima",
                    "email": "pedro@example.com",
                    "createdAt": now,
                }),
            )
            .await
            .unwrap();

        store
            .set(
                super::COMPLAINTS,
                "c1",
                json!({
                    "description": "buraco na rua principal",
                    "userId": "u1",
                    "userName": "maria@example.com",
                    "situation": { "status": 0 },
                    "address": {
                        "district": "Centro",
                        "city": "Imperatriz",
                        "latitude": -5.52,
                        "longitude": -47.48,
                    },
                    "createdAt": now,
                }),
            )
            .await
            .unwrap();
        store
            .set(
                super::COMPLAINTS,
                "c2",
                json!({
                    "description": "lixo acumulado na esquina",
                    "userId": "a1",
                    "userName": "ana@example.com",
                    "situation": { "status": 1 },
                    "address": {
                        "district": "Vila Nova",
                        "city": "Imperatriz",
                        "latitude": -5.5205,
                        "longitude": -47.4805,
                    },
                    "createdAt": now - Duration::days(3),
                }),
            )
            .await
            .unwrap();

        let identity = StaticIdentity::new()
            .with_token(TOKEN_CITIZEN, "u1", "maria@example.com")
            .with_token(TOKEN_ADMIN, "a1", "ana@example.com")
            .with_token(TOKEN_OTHER, "u2", "pedro@example.com");

        web::Data::new(AppState {
            store: Arc::new(store),
            identity: Arc::new(identity),
        })
    }

    async fn get(state: &web::Data<AppState>, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(crate::configure))
                .await;
        let mut req = test::TestRequest::get().uri(path);
        if let Some(token) = token {
            req = req.insert_header(("Authorization", format!("Bearer {token}")));
        }
        let resp = test::call_service(&app, req.to_request()).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }

    async fn send_json(
        state: &web::Data<AppState>,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(crate::configure))
                .await;
        let mut req = match method {
            "POST" => test::TestRequest::post(),
            _ => test::TestRequest::patch(),
        }
        .uri(path)
        .set_json(body);
        if let Some(token) = token {
            req = req.insert_header(("Authorization", format!("Bearer {token}")));
        }
        let resp = test::call_service(&app, req.to_request()).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let state = seeded_state().await;
        let (status, body) = get(&state, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["healthy"], true);
    }

    #[actix_web::test]
    async fn anonymous_listing_hides_reporter_identity() {
        let state = seeded_state().await;
        let (status, body) = get(&state, "/api/v1/complaints", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let items = body["data"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        for item in items {
            assert!(item.get("userId").is_none());
            assert!(item.get("canEdit").is_none());
        }
    }

    #[actix_web::test]
    async fn owner_gets_identity_and_capabilities() {
        let state = seeded_state().await;
        let (status, body) =
            get(&state, "/api/v1/complaints/c1", Some(TOKEN_CITIZEN)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isOwner"], true);
        assert_eq!(body["data"]["canEdit"], true);

        let (_, other) = get(&state, "/api/v1/complaints/c1", Some(TOKEN_OTHER)).await;
        assert!(other["data"].get("userId").is_none());
        assert_eq!(other["data"]["canReport"], true);
    }

    #[actix_web::test]
    async fn missing_complaint_is_404() {
        let state = seeded_state().await;
        let (status, body) = get(&state, "/api/v1/complaints/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["statuscode"], 404);
    }

    #[actix_web::test]
    async fn submission_requires_auth_and_body_fields() {
        let state = seeded_state().await;
        let body = json!({ "description": "poste apagado", "address": { "street": "Rua A" } });

        let (status, _) =
            send_json(&state, "POST", "/api/v1/complaints", None, body.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send_json(
            &state,
            "POST",
            "/api/v1/complaints",
            Some(TOKEN_CITIZEN),
            json!({ "description": "sem endereço" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, created) = send_json(
            &state,
            "POST",
            "/api/v1/complaints",
            Some(TOKEN_CITIZEN),
            body,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["data"]["isOwner"], true);
        assert_eq!(created["data"]["similarCount"], 0);

        // the reporter's counter was bumped
        let doc = state.store.get(super::USERS, "u1").await.unwrap().unwrap();
        assert_eq!(doc.data["complaintsCount"], 2);
    }

    #[actix_web::test]
    async fn heatmap_carries_points_clusters_and_summary() {
        let state = seeded_state().await;
        let (status, body) = get(&state, "/api/v1/complaints/heatmap?zoom=10", None).await;
        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["points"].as_array().unwrap().len(), 2);
        // both points sit ~60m apart, inside the 1km radius at zoom 10
        assert_eq!(data["clusters"].as_array().unwrap().len(), 1);
        assert_eq!(data["clusters"][0]["count"], 2);
        assert_eq!(data["summary"]["total"], 2);
        assert_eq!(data["summary"]["byStatus"]["pending"], 1);
        assert_eq!(data["summary"]["byStatus"]["progress"], 1);
        assert!(data["summary"]["center"].is_object());
        assert_eq!(body["meta"]["zoom_level"], 10);
    }

    #[actix_web::test]
    async fn heatmap_status_filter_narrows_the_snapshot() {
        let state = seeded_state().await;
        let (_, body) =
            get(&state, "/api/v1/complaints/heatmap?status=pending", None).await;
        assert_eq!(body["data"]["summary"]["total"], 1);
        assert_eq!(body["meta"]["filtered_by"], "pending");
    }

    #[actix_web::test]
    async fn relevance_feed_is_scored_and_sorted() {
        let state = seeded_state().await;
        let (status, body) = get(&state, "/api/v1/complaints/relevant", None).await;
        assert_eq!(status, StatusCode::OK);
        let items = body["data"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["relevanceScore"], 100);
        let second = items[1]["relevanceScore"].as_u64().unwrap();
        assert!(second <= 100);
        assert!(items[0].get("userId").is_none());
    }

    #[actix_web::test]
    async fn proximity_validates_coordinates() {
        let state = seeded_state().await;
        let (status, _) = get(
            &state,
            "/api/v1/complaints/proximity?latitude=91.0&longitude=0.0",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get(
            &state,
            "/api/v1/complaints/proximity?latitude=-5.52&longitude=-47.48",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let items = body["data"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["distanceKm"], 0.0);
    }

    #[actix_web::test]
    async fn district_match_ignores_case_and_spaces() {
        let state = seeded_state().await;
        let (status, body) =
            get(&state, "/api/v1/complaints/district/VILA%20NOVA", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, _) = get(&state, "/api/v1/complaints/district/nowhere", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn search_requires_a_real_query() {
        let state = seeded_state().await;
        let (status, _) = get(&state, "/api/v1/search?q=a", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get(&state, "/api/v1/search?q=buraco", None).await;
        assert_eq!(status, StatusCode::OK);
        let items = body["data"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["type"], "complaint");
        assert_eq!(body["meta"]["summary"]["complaints"], 1);
    }

    #[actix_web::test]
    async fn search_tolerates_out_of_range_pages() {
        let state = seeded_state().await;
        let path = format!("/api/v1/search?q=buraco&page={}", usize::MAX);
        let (status, body) = get(&state, &path, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 0);
        assert_eq!(body["meta"]["summary"]["complaints"], 1);
    }

    #[actix_web::test]
    async fn search_finds_users_by_name() {
        let state = seeded_state().await;
        let (_, body) = get(&state, "/api/v1/search?q=maria&type=users", None).await;
        let items = body["data"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "u1");
    }

    #[actix_web::test]
    async fn user_directory_is_authenticated_and_minimal() {
        let state = seeded_state().await;
        let (status, _) = get(&state, "/api/v1/users", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = get(&state, "/api/v1/users", Some(TOKEN_CITIZEN)).await;
        assert_eq!(status, StatusCode::OK);
        let users = body["data"].as_array().unwrap();
        assert_eq!(users.len(), 3);
        assert!(users[0].get("email").is_none());
        assert!(users[0].get("fullName").is_some());
    }

    #[actix_web::test]
    async fn profile_is_owner_only() {
        let state = seeded_state().await;
        let (status, _) = get(&state, "/api/v1/users/u1", Some(TOKEN_OTHER)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = get(&state, "/api/v1/users/u1", Some(TOKEN_CITIZEN)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "maria@example.com");
    }

    #[actix_web::test]
    async fn user_statistics_cover_overview_growth_demographics() {
        let state = seeded_state().await;
        let (status, body) = get(&state, "/api/v1/users/statistics", None).await;
        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["overview"]["totalUsers"], 3);
        assert_eq!(data["overview"]["verifiedUsers"], 1);
        assert_eq!(data["growth"]["last7Days"], 2);
        assert_eq!(data["demographics"]["topCities"][0]["name"], "Imperatriz");
    }

    #[actix_web::test]
    async fn dashboard_reports_kpis_and_optional_details() {
        let state = seeded_state().await;
        let (status, body) = get(&state, "/api/v1/dashboard", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["overview"]["complaints"]["total"], 2);
        assert!(body["data"].get("details").is_none());

        let (_, detailed) =
            get(&state, "/api/v1/dashboard?includeDetails=true", None).await;
        assert!(detailed["data"]["details"]["statusFlow"].is_object());
        assert_eq!(detailed["data"]["details"]["statusFlow"]["pending"], 1);
    }

    #[actix_web::test]
    async fn realtime_kpis_include_alert_block() {
        let state = seeded_state().await;
        let (status, body) = get(&state, "/api/v1/dashboard/realtime-kpis", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["current"]["totalComplaints"], 2);
        assert!(body["data"]["alerts"].is_array());
    }

    #[actix_web::test]
    async fn admin_gate_distinguishes_401_and_403() {
        let state = seeded_state().await;
        let (status, _) = get(&state, "/api/v1/admin/users", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = get(&state, "/api/v1/admin/users", Some(TOKEN_CITIZEN)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = get(&state, "/api/v1/admin/users", Some(TOKEN_ADMIN)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["summary"]["total"], 3);
    }

    #[actix_web::test]
    async fn admin_user_action_updates_and_logs() {
        let state = seeded_state().await;
        let (status, body) = send_json(
            &state,
            "PATCH",
            "/api/v1/admin/users/u2",
            Some(TOKEN_ADMIN),
            json!({ "action": "verify", "reason": "documents checked" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["verified"], true);

        let logs = state.store.list(super::ADMIN_LOGS).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].data["action"], "verify");
        assert_eq!(logs[0].data["type"], "user_action");
        assert_eq!(logs[0].data["adminId"], "a1");
    }

    #[actix_web::test]
    async fn admin_complaint_status_change_is_validated_and_logged() {
        let state = seeded_state().await;
        let (status, _) = send_json(
            &state,
            "PATCH",
            "/api/v1/admin/complaints/c1",
            Some(TOKEN_ADMIN),
            json!({ "action": "update_status", "status": 9 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send_json(
            &state,
            "PATCH",
            "/api/v1/admin/complaints/c1",
            Some(TOKEN_ADMIN),
            json!({ "action": "update_status", "status": 2, "reason": "crew confirmed" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["situation"]["status"], 2);

        let logs = state.store.list(super::ADMIN_LOGS).await.unwrap();
        assert_eq!(logs[0].data["newStatus"], 2);
    }

    #[actix_web::test]
    async fn audit_trail_filters_and_summarizes() {
        let state = seeded_state().await;
        for action in ["verify", "suspend"] {
            let (status, _) = send_json(
                &state,
                "PATCH",
                "/api/v1/admin/users/u2",
                Some(TOKEN_ADMIN),
                json!({ "action": action }),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = get(
            &state,
            "/api/v1/admin/audit-logs?type=user_action",
            Some(TOKEN_ADMIN),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["logs"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["summary"]["uniqueAdmins"], 1);
        assert_eq!(body["data"]["summary"]["userActions"], 2);
    }
}
