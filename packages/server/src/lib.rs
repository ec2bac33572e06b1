#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the civic map application.
//!
//! Serves the REST API the mobile app talks to: citizen registration and
//! login, geolocated complaint reporting, the map heatmap and relevance
//! feeds, unified search, dashboards, and the admin moderation surface.
//! Complaints and users live in an external document store (Firestore in
//! production, in-memory in tests); authentication is delegated to the
//! Google Identity Toolkit behind the [`IdentityProvider`] seam.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use civic_map_auth::{IdentityProvider, google::GoogleIdentity};
use civic_map_store::{DocumentStore, firestore::FirestoreStore};

/// Shared application state.
pub struct AppState {
    /// Document store holding users, complaints, and admin logs.
    pub store: Arc<dyn DocumentStore>,
    /// Token verification and credential exchange.
    pub identity: Arc<dyn IdentityProvider>,
}

/// Registers every API route on the given service config.
///
/// Split out from [`run_server`] so integration tests can mount the same
/// routing table on an in-memory state.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health)).service(
        web::scope("/api/v1")
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(handlers::auth::register))
                    .route("/login", web::post().to(handlers::auth::login)),
            )
            .service(
                web::scope("/users")
                    .route("", web::get().to(handlers::users::list))
                    .route("/statistics", web::get().to(handlers::users::statistics))
                    .route("/{uid}", web::get().to(handlers::users::profile))
                    .route(
                        "/{uid}/complaints",
                        web::get().to(handlers::users::complaints),
                    ),
            )
            .service(
                web::scope("/complaints")
                    .route("", web::get().to(handlers::complaints::list))
                    .route("", web::post().to(handlers::complaints::create))
                    .route(
                        "/positions",
                        web::get().to(handlers::complaints::positions),
                    )
                    .route("/heatmap", web::get().to(handlers::complaints::heatmap))
                    .route("/relevant", web::get().to(handlers::complaints::relevant))
                    .route(
                        "/proximity",
                        web::get().to(handlers::complaints::proximity),
                    )
                    .route(
                        "/district/{district}",
                        web::get().to(handlers::complaints::by_district),
                    )
                    .route("/{id}", web::get().to(handlers::complaints::detail)),
            )
            .service(
                web::scope("/search")
                    .route("", web::get().to(handlers::search::unified))
                    .route(
                        "/suggestions",
                        web::get().to(handlers::search::suggestions),
                    )
                    .route(
                        "/autocomplete",
                        web::get().to(handlers::search::autocomplete),
                    ),
            )
            .service(
                web::scope("/dashboard")
                    .route("", web::get().to(handlers::dashboard::overview))
                    .route(
                        "/realtime-kpis",
                        web::get().to(handlers::dashboard::realtime_kpis),
                    ),
            )
            .service(
                web::scope("/admin")
                    .route("", web::get().to(handlers::admin::overview))
                    .route("/users", web::get().to(handlers::admin::users))
                    .route(
                        "/users/{uid}",
                        web::patch().to(handlers::admin::user_action),
                    )
                    .route("/complaints", web::get().to(handlers::admin::complaints))
                    .route(
                        "/complaints/{id}",
                        web::patch().to(handlers::admin::complaint_action),
                    )
                    .route("/audit-logs", web::get().to(handlers::admin::audit_logs)),
            ),
    );
}

/// Starts the civic map API server.
///
/// Builds the Firestore-backed document store and the Google Identity
/// client from the environment, then starts the Actix-Web HTTP server.
/// This is a regular async function — the caller provides the runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if `FIRESTORE_PROJECT_ID` or `FIRESTORE_API_KEY` is not set.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let project_id =
        std::env::var("FIRESTORE_PROJECT_ID").expect("FIRESTORE_PROJECT_ID must be set");
    let api_key = std::env::var("FIRESTORE_API_KEY").expect("FIRESTORE_API_KEY must be set");
    let identity_key = std::env::var("IDENTITY_API_KEY").unwrap_or_else(|_| api_key.clone());

    let client = reqwest::Client::new();
    let store = FirestoreStore::new(client.clone(), &project_id, api_key);
    let identity = GoogleIdentity::new(client, identity_key);

    let state = web::Data::new(AppState {
        store: Arc::new(store),
        identity: Arc::new(identity),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
