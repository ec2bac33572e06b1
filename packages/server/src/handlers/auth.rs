//! Registration and login handlers.
//!
//! Both endpoints are thin wrappers over the identity provider: the
//! provider owns credentials and tokens, this layer owns the user profile
//! document keyed by the provider UID.

use actix_web::{HttpResponse, http::StatusCode, web};
use chrono::Utc;
use civic_map_auth::AuthError;
use civic_map_complaint_models::UserRecord;
use civic_map_server_models::{ApiResponse, LoginRequest, RegisterRequest, SessionData};

use crate::AppState;
use crate::handlers::{USERS, respond_error, store_failure};

fn auth_failure(context: &str, err: &AuthError) -> HttpResponse {
    match err {
        AuthError::InvalidCredentials => {
            respond_error(StatusCode::UNAUTHORIZED, "Invalid email or password")
        }
        AuthError::EmailExists => {
            respond_error(StatusCode::CONFLICT, "Email is already registered")
        }
        AuthError::WeakPassword(detail) => respond_error(
            StatusCode::BAD_REQUEST,
            &format!("Password too weak: {detail}"),
        ),
        AuthError::InvalidToken => {
            respond_error(StatusCode::UNAUTHORIZED, "Invalid or expired token")
        }
        AuthError::Http(_) | AuthError::Provider(_) => {
            log::error!("{context}: {err}");
            respond_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service unavailable",
            )
        }
    }
}

/// `POST /api/v1/auth/register`
///
/// Creates the identity-provider account and the matching profile
/// document, then returns the first session.
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> HttpResponse {
    let body = body.into_inner();
    if body.email.trim().is_empty() || body.password.is_empty() || body.full_name.trim().is_empty()
    {
        return respond_error(
            StatusCode::BAD_REQUEST,
            "email, password and fullName are required",
        );
    }

    let session = match state.identity.sign_up(&body.email, &body.password).await {
        Ok(session) => session,
        Err(err) => return auth_failure("Failed to register account", &err),
    };

    let now = Utc::now();
    let profile = UserRecord {
        uid: session.uid.clone(),
        full_name: body.full_name.clone(),
        email: session.email.clone(),
        document_number: body.document_number.clone(),
        phone_number: body.phone_number.clone(),
        created_at: Some(now),
        updated_at: Some(now),
        ..UserRecord::default()
    };

    let data = match serde_json::to_value(&profile) {
        Ok(data) => data,
        Err(err) => {
            log::error!("Failed to encode user profile: {err}");
            return respond_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };
    if let Err(err) = state.store.set(USERS, &session.uid, data).await {
        return store_failure("Failed to store user profile", &err);
    }

    HttpResponse::Created().json(ApiResponse::created(
        SessionData {
            uid: session.uid,
            email: session.email,
            full_name: body.full_name,
            document_number: Some(body.document_number).filter(|d| !d.is_empty()),
            phone_number: Some(body.phone_number).filter(|p| !p.is_empty()),
            photo_url: None,
            token: session.id_token,
        },
        "Account created successfully",
    ))
}

/// `POST /api/v1/auth/login`
///
/// Exchanges credentials for a session and attaches the stored profile.
/// Suspended accounts cannot sign in.
pub async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> HttpResponse {
    let body = body.into_inner();
    if body.email.trim().is_empty() || body.password.is_empty() {
        return respond_error(StatusCode::BAD_REQUEST, "email and password are required");
    }

    let session = match state.identity.sign_in(&body.email, &body.password).await {
        Ok(session) => session,
        Err(err) => return auth_failure("Failed to sign in", &err),
    };

    let profile: UserRecord = match state.store.get(USERS, &session.uid).await {
        Ok(Some(doc)) => match doc.decode() {
            Ok(profile) => profile,
            Err(err) => {
                log::warn!("Malformed user document {}: {err}", session.uid);
                UserRecord::default()
            }
        },
        Ok(None) => UserRecord::default(),
        Err(err) => return store_failure("Failed to load user profile", &err),
    };

    if profile.suspended || profile.deleted {
        return respond_error(StatusCode::FORBIDDEN, "Account is suspended");
    }

    HttpResponse::Ok().json(ApiResponse::ok(SessionData {
        uid: session.uid,
        email: session.email,
        full_name: profile.full_name,
        document_number: Some(profile.document_number).filter(|d| !d.is_empty()),
        phone_number: Some(profile.phone_number).filter(|p| !p.is_empty()),
        photo_url: profile.photo_url,
        token: session.id_token,
    }))
}
