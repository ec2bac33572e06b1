//! User handlers: directory, statistics, and owner-only profile access.

use actix_web::{HttpRequest, HttpResponse, http::StatusCode, web};
use chrono::Utc;
use civic_map_analytics::users::UserStatistics;
use civic_map_complaint_models::UserRecord;
use civic_map_server_models::{ApiComplaint, ApiResponse};
use serde::Serialize;
use serde_json::json;

use crate::AppState;
use crate::handlers::{
    USERS, authenticate, load_complaints, load_users, respond_error, store_failure,
};

/// The directory exposes names only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserSummary {
    uid: String,
    full_name: String,
}

/// `GET /api/v1/users`
///
/// Authenticated directory of registered citizens: UID and name only.
pub async fn list(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    if let Err(resp) = authenticate(&state, &req).await {
        return resp;
    }

    let users = match load_users(&state).await {
        Ok(users) => users,
        Err(err) => return store_failure("Failed to list users", &err),
    };

    let summaries: Vec<UserSummary> = users
        .into_iter()
        .filter(|u| !u.deleted)
        .map(|u| UserSummary {
            uid: u.uid,
            full_name: u.full_name,
        })
        .collect();

    let total = summaries.len();
    HttpResponse::Ok().json(ApiResponse::ok_with_meta(summaries, json!({ "total": total })))
}

/// `GET /api/v1/users/statistics`
///
/// Aggregate user-base statistics: overview, growth, demographics.
pub async fn statistics(state: web::Data<AppState>) -> HttpResponse {
    let users = match load_users(&state).await {
        Ok(users) => users,
        Err(err) => return store_failure("Failed to compute user statistics", &err),
    };
    let complaints = match load_complaints(&state).await {
        Ok(complaints) => complaints,
        Err(err) => return store_failure("Failed to compute user statistics", &err),
    };

    let stats = UserStatistics::compute(&users, &complaints, Utc::now());
    HttpResponse::Ok().json(ApiResponse::ok_with_meta(
        stats,
        json!({ "generated_at": Utc::now() }),
    ))
}

/// `GET /api/v1/users/{uid}`
///
/// Full profile, visible to its owner only.
pub async fn profile(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> HttpResponse {
    let auth = match authenticate(&state, &req).await {
        Ok(auth) => auth,
        Err(resp) => return resp,
    };
    if auth.uid != *path {
        return respond_error(StatusCode::FORBIDDEN, "You can only access your own profile");
    }

    let user: UserRecord = match state.store.get(USERS, &path).await {
        Ok(Some(doc)) => match doc.decode() {
            Ok(user) => user,
            Err(err) => {
                log::warn!("Malformed user document {}: {err}", doc.id);
                return respond_error(StatusCode::NOT_FOUND, "User not found");
            }
        },
        Ok(None) => return respond_error(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => return store_failure("Failed to load user profile", &err),
    };
    if user.deleted {
        return respond_error(StatusCode::NOT_FOUND, "User not found");
    }

    HttpResponse::Ok().json(ApiResponse::ok(user))
}

/// `GET /api/v1/users/{uid}/complaints`
///
/// The owner's own complaints, newest first, with the owner extension.
pub async fn complaints(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> HttpResponse {
    let auth = match authenticate(&state, &req).await {
        Ok(auth) => auth,
        Err(resp) => return resp,
    };
    if auth.uid != *path {
        return respond_error(
            StatusCode::FORBIDDEN,
            "You can only access your own complaints",
        );
    }

    let mut mine: Vec<_> = match load_complaints(&state).await {
        Ok(complaints) => complaints
            .into_iter()
            .filter(|c| !c.deleted && c.user_id == *path)
            .collect(),
        Err(err) => return store_failure("Failed to list user complaints", &err),
    };
    if mine.is_empty() {
        return respond_error(StatusCode::NOT_FOUND, "No complaints found for this user");
    }
    mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let views: Vec<ApiComplaint> = mine
        .iter()
        .map(|c| ApiComplaint::for_viewer(c, Some(&auth.uid)))
        .collect();

    let total = views.len();
    HttpResponse::Ok().json(ApiResponse::ok_with_meta(views, json!({ "total": total })))
}
