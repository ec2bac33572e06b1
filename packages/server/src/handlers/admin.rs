//! Moderation handlers, gated behind [`require_admin`].
//!
//! Every mutating action writes an entry to the `admin_logs` collection
//! before responding, so the audit trail never lags the data.

use actix_web::{HttpRequest, HttpResponse, http::StatusCode, web};
use chrono::Utc;
use civic_map_complaint_models::{
    AdminLogKind, AdminLogRecord, ComplaintRecord, ComplaintStatus, ModerationNote, UserRecord,
    classify,
};
use civic_map_server_models::{
    AdminComplaintAction, AdminListParams, AdminUserAction, ApiResponse, AuditLogParams,
    Pagination,
};
use serde_json::{Value, json};

use crate::AppState;
use crate::handlers::{
    ADMIN_LOGS, COMPLAINTS, USERS, is_admin, load_admin_logs, load_complaints, load_users,
    require_admin, respond_error, store_failure,
};

/// Default page size for admin listings.
const LIST_DEFAULT: usize = 25;
/// Default page size for the audit trail.
const AUDIT_DEFAULT: usize = 50;
/// Largest accepted page size.
const MAX_LIMIT: usize = 100;

fn page_params(page: Option<usize>, limit: Option<usize>, default_limit: usize) -> (usize, usize) {
    (
        page.unwrap_or(1).max(1),
        limit.unwrap_or(default_limit).clamp(1, MAX_LIMIT),
    )
}

/// Appends an audit entry. Failures are logged, not surfaced: the action
/// itself already happened.
async fn write_log(state: &AppState, log: AdminLogRecord) {
    let mut data = match serde_json::to_value(&log) {
        Ok(data) => data,
        Err(err) => {
            log::error!("Failed to encode admin log: {err}");
            return;
        }
    };
    // The store assigns the document ID; an empty one must not shadow it.
    if let Some(map) = data.as_object_mut() {
        map.remove("id");
    }
    if let Err(err) = state.store.insert(ADMIN_LOGS, data).await {
        log::error!("Failed to write admin log: {err}");
    }
}

/// `GET /api/v1/admin`
///
/// Moderation landing block: headline counts plus the most recent audit
/// entries.
pub async fn overview(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    if let Err(resp) = require_admin(&state, &req).await {
        return resp;
    }

    let users = match load_users(&state).await {
        Ok(users) => users,
        Err(err) => return store_failure("Failed to build admin overview", &err),
    };
    let complaints = match load_complaints(&state).await {
        Ok(complaints) => complaints,
        Err(err) => return store_failure("Failed to build admin overview", &err),
    };
    let mut logs = match load_admin_logs(&state).await {
        Ok(logs) => logs,
        Err(err) => return store_failure("Failed to build admin overview", &err),
    };
    logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    logs.truncate(5);

    HttpResponse::Ok().json(ApiResponse::ok(json!({
        "users": {
            "total": users.len(),
            "verified": users.iter().filter(|u| u.verified).count(),
            "suspended": users.iter().filter(|u| u.suspended).count(),
            "deleted": users.iter().filter(|u| u.deleted).count(),
        },
        "complaints": {
            "total": complaints.len(),
            "pending": complaints
                .iter()
                .filter(|c| c.status() == ComplaintStatus::Pending)
                .count(),
            "flagged": complaints.iter().filter(|c| c.flagged).count(),
            "deleted": complaints.iter().filter(|c| c.deleted).count(),
        },
        "recentActions": logs,
    })))
}

fn user_matches_status(user: &UserRecord, status: &str) -> bool {
    match status {
        "verified" => user.verified,
        "unverified" => !user.verified,
        "suspended" => user.suspended,
        "deleted" => user.deleted,
        _ => true,
    }
}

/// `GET /api/v1/admin/users`
///
/// Paginated user listing with status filter and name/email search.
pub async fn users(
    state: web::Data<AppState>,
    req: HttpRequest,
    params: web::Query<AdminListParams>,
) -> HttpResponse {
    if let Err(resp) = require_admin(&state, &req).await {
        return resp;
    }

    let all = match load_users(&state).await {
        Ok(users) => users,
        Err(err) => return store_failure("Failed to list users", &err),
    };

    let needle = params
        .search
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default();
    let status = params.status.as_deref().unwrap_or("all");

    let mut matches: Vec<&UserRecord> = all
        .iter()
        .filter(|u| user_matches_status(u, status))
        .filter(|u| {
            needle.is_empty()
                || u.full_name.to_lowercase().contains(&needle)
                || u.email.to_lowercase().contains(&needle)
        })
        .collect();
    matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let (page, limit) = page_params(params.page, params.limit, LIST_DEFAULT);
    let pagination = Pagination::new(page, limit, matches.len());
    let (start, end) = pagination.slice_bounds();

    let rows: Vec<Value> = matches[start..end]
        .iter()
        .map(|user| {
            let mut row = serde_json::to_value(user).unwrap_or_else(|_| json!({}));
            if let Some(map) = row.as_object_mut() {
                map.insert("isAdmin".to_string(), Value::from(is_admin(user)));
            }
            row
        })
        .collect();

    HttpResponse::Ok().json(ApiResponse::ok_with_meta(
        json!({
            "users": rows,
            "pagination": pagination,
            "summary": {
                "total": all.len(),
                "verified": all.iter().filter(|u| u.verified).count(),
                "suspended": all.iter().filter(|u| u.suspended).count(),
                "deleted": all.iter().filter(|u| u.deleted).count(),
            },
        }),
        json!({ "status": status, "search": params.search }),
    ))
}

/// `PATCH /api/v1/admin/users/{uid}`
///
/// Applies a moderation action to a user account and records it.
pub async fn user_action(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<AdminUserAction>,
) -> HttpResponse {
    let admin = match require_admin(&state, &req).await {
        Ok(admin) => admin,
        Err(resp) => return resp,
    };

    let body = body.into_inner();
    let patch = match body.action.as_str() {
        "verify" => json!({ "verified": true }),
        "unverify" => json!({ "verified": false }),
        "suspend" => json!({ "suspended": true }),
        "unsuspend" => json!({ "suspended": false }),
        "delete" => json!({ "deleted": true }),
        _ => return respond_error(StatusCode::BAD_REQUEST, "Unknown action"),
    };

    let mut patch = patch;
    if let Some(map) = patch.as_object_mut() {
        map.insert("updatedAt".to_string(), json!(Utc::now()));
    }

    let updated = match state.store.update(USERS, &path, patch).await {
        Ok(doc) => doc,
        Err(err) if err.is_not_found() => {
            return respond_error(StatusCode::NOT_FOUND, "User not found");
        }
        Err(err) => return store_failure("Failed to update user", &err),
    };

    write_log(
        &state,
        AdminLogRecord {
            id: String::new(),
            kind: AdminLogKind::UserAction,
            action: body.action.clone(),
            target_user_id: Some(path.clone()),
            target_complaint_id: None,
            admin_id: admin.uid.clone(),
            admin_name: admin.full_name.clone(),
            reason: body.reason.unwrap_or_default(),
            new_status: None,
            moderation_note: None,
            timestamp: Utc::now(),
        },
    )
    .await;

    HttpResponse::Ok().json(ApiResponse {
        success: true,
        statuscode: 200,
        data: Some(updated.data),
        message: Some(format!("User {} successful", body.action)),
        meta: None,
    })
}

fn complaint_matches_status(complaint: &ComplaintRecord, status: &str) -> bool {
    match status {
        "pending" => complaint.status() == ComplaintStatus::Pending,
        "progress" => complaint.status() == ComplaintStatus::InProgress,
        "resolved" => complaint.status() == ComplaintStatus::Resolved,
        "closed" => complaint.status() == ComplaintStatus::Closed,
        _ => true,
    }
}

/// `GET /api/v1/admin/complaints`
///
/// Paginated complaint listing with status, priority, flagged, and text
/// filters. Rows carry the full record plus the derived priority.
pub async fn complaints(
    state: web::Data<AppState>,
    req: HttpRequest,
    params: web::Query<AdminListParams>,
) -> HttpResponse {
    if let Err(resp) = require_admin(&state, &req).await {
        return resp;
    }

    let all = match load_complaints(&state).await {
        Ok(complaints) => complaints,
        Err(err) => return store_failure("Failed to list complaints", &err),
    };

    let now = Utc::now();
    let needle = params
        .search
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default();
    let status = params.status.as_deref().unwrap_or("all");
    let flagged_only = params.flagged.as_deref() == Some("true");

    let mut matches: Vec<&ComplaintRecord> = all
        .iter()
        .filter(|c| complaint_matches_status(c, status))
        .filter(|c| !flagged_only || c.flagged)
        .filter(|c| {
            params.priority.as_deref().is_none_or(|wanted| {
                classify(c, now).to_string() == wanted
            })
        })
        .filter(|c| needle.is_empty() || c.description.to_lowercase().contains(&needle))
        .collect();
    matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let (page, limit) = page_params(params.page, params.limit, LIST_DEFAULT);
    let pagination = Pagination::new(page, limit, matches.len());
    let (start, end) = pagination.slice_bounds();

    let rows: Vec<Value> = matches[start..end]
        .iter()
        .map(|complaint| {
            let mut row = serde_json::to_value(complaint).unwrap_or_else(|_| json!({}));
            if let Some(map) = row.as_object_mut() {
                map.insert(
                    "priority".to_string(),
                    Value::from(classify(complaint, now).to_string()),
                );
            }
            row
        })
        .collect();

    HttpResponse::Ok().json(ApiResponse::ok_with_meta(
        json!({
            "complaints": rows,
            "pagination": pagination,
            "summary": {
                "total": all.len(),
                "pending": all
                    .iter()
                    .filter(|c| c.status() == ComplaintStatus::Pending)
                    .count(),
                "flagged": all.iter().filter(|c| c.flagged).count(),
                "deleted": all.iter().filter(|c| c.deleted).count(),
            },
        }),
        json!({ "status": status, "search": params.search }),
    ))
}

/// `PATCH /api/v1/admin/complaints/{id}`
///
/// Applies a moderation action to a complaint and records it.
pub async fn complaint_action(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<AdminComplaintAction>,
) -> HttpResponse {
    let admin = match require_admin(&state, &req).await {
        Ok(admin) => admin,
        Err(resp) => return resp,
    };

    let body = body.into_inner();
    let now = Utc::now();
    let mut new_status = None;
    let mut moderation_note = None;

    let patch = match body.action.as_str() {
        "update_status" => {
            let Some(value) = body.status else {
                return respond_error(StatusCode::BAD_REQUEST, "status is required");
            };
            let Ok(status) = ComplaintStatus::from_value(value) else {
                return respond_error(StatusCode::BAD_REQUEST, "status must be 0-3");
            };
            new_status = Some(status.value());
            json!({ "situation": { "status": status.value() } })
        }
        "flag" => json!({ "flagged": true }),
        "unflag" => json!({ "flagged": false }),
        "delete" => json!({ "deleted": true }),
        "moderate" => {
            let Some(note) = body.moderation_note.clone().filter(|n| !n.is_empty()) else {
                return respond_error(StatusCode::BAD_REQUEST, "moderationNote is required");
            };
            moderation_note = Some(note.clone());

            // Appending to the notes array needs the current document.
            let existing: ComplaintRecord = match state.store.get(COMPLAINTS, &path).await {
                Ok(Some(doc)) => match doc.decode() {
                    Ok(record) => record,
                    Err(err) => {
                        log::warn!("Malformed complaint document {}: {err}", doc.id);
                        ComplaintRecord::default()
                    }
                },
                Ok(None) => return respond_error(StatusCode::NOT_FOUND, "Complaint not found"),
                Err(err) => return store_failure("Failed to load complaint", &err),
            };

            let mut notes = existing.moderation_notes;
            notes.push(ModerationNote {
                note,
                admin_id: admin.uid.clone(),
                admin_name: admin.full_name.clone(),
                timestamp: now,
            });
            json!({ "moderationNotes": notes, "lastModerated": now })
        }
        _ => return respond_error(StatusCode::BAD_REQUEST, "Unknown action"),
    };

    let mut patch = patch;
    if let Some(map) = patch.as_object_mut() {
        map.insert("updatedAt".to_string(), json!(now));
    }

    let updated = match state.store.update(COMPLAINTS, &path, patch).await {
        Ok(doc) => doc,
        Err(err) if err.is_not_found() => {
            return respond_error(StatusCode::NOT_FOUND, "Complaint not found");
        }
        Err(err) => return store_failure("Failed to update complaint", &err),
    };

    write_log(
        &state,
        AdminLogRecord {
            id: String::new(),
            kind: AdminLogKind::ComplaintAction,
            action: body.action.clone(),
            target_user_id: None,
            target_complaint_id: Some(path.clone()),
            admin_id: admin.uid.clone(),
            admin_name: admin.full_name.clone(),
            reason: body.reason.unwrap_or_default(),
            new_status,
            moderation_note,
            timestamp: now,
        },
    )
    .await;

    HttpResponse::Ok().json(ApiResponse {
        success: true,
        statuscode: 200,
        data: Some(updated.data),
        message: Some(format!("Complaint {} successful", body.action)),
        meta: None,
    })
}

/// `GET /api/v1/admin/audit-logs`
///
/// The audit trail, newest first, filterable by kind and acting admin.
pub async fn audit_logs(
    state: web::Data<AppState>,
    req: HttpRequest,
    params: web::Query<AuditLogParams>,
) -> HttpResponse {
    if let Err(resp) = require_admin(&state, &req).await {
        return resp;
    }

    let all = match load_admin_logs(&state).await {
        Ok(logs) => logs,
        Err(err) => return store_failure("Failed to list audit logs", &err),
    };

    let kind = params.kind.as_deref().unwrap_or("all");
    let mut matches: Vec<&AdminLogRecord> = all
        .iter()
        .filter(|l| match kind {
            "user_action" => l.kind == AdminLogKind::UserAction,
            "complaint_action" => l.kind == AdminLogKind::ComplaintAction,
            _ => true,
        })
        .filter(|l| {
            params
                .admin_id
                .as_deref()
                .is_none_or(|admin_id| l.admin_id == admin_id)
        })
        .collect();
    matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let (page, limit) = page_params(params.page, params.limit, AUDIT_DEFAULT);
    let pagination = Pagination::new(page, limit, matches.len());
    let (start, end) = pagination.slice_bounds();

    let mut admins: Vec<&str> = all.iter().map(|l| l.admin_id.as_str()).collect();
    admins.sort_unstable();
    admins.dedup();

    let rows: Vec<&AdminLogRecord> = matches[start..end].to_vec();
    HttpResponse::Ok().json(ApiResponse::ok_with_meta(
        json!({
            "logs": rows,
            "pagination": pagination,
            "summary": {
                "total": all.len(),
                "userActions": all
                    .iter()
                    .filter(|l| l.kind == AdminLogKind::UserAction)
                    .count(),
                "complaintActions": all
                    .iter()
                    .filter(|l| l.kind == AdminLogKind::ComplaintAction)
                    .count(),
                "uniqueAdmins": admins.len(),
            },
        }),
        json!({ "type": kind, "adminId": params.admin_id }),
    ))
}
