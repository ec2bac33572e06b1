//! Dashboard handlers: the windowed KPI report and the realtime block.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use civic_map_analytics::details::{
    category_breakdown, geographical_breakdown, status_flow, timeline, user_segments,
};
use civic_map_analytics::kpis::Kpis;
use civic_map_analytics::realtime::RealtimeKpis;
use civic_map_analytics::timeframe_days;
use civic_map_server_models::{ApiResponse, DashboardParams};
use serde_json::json;

use crate::AppState;
use crate::handlers::{load_complaints, load_users, store_failure};

/// `GET /api/v1/dashboard`
///
/// KPI report over a trailing window. `includeDetails=true` adds the
/// timeline, geographic, category, status-flow, and segment breakdowns.
pub async fn overview(
    state: web::Data<AppState>,
    params: web::Query<DashboardParams>,
) -> HttpResponse {
    let users = match load_users(&state).await {
        Ok(users) => users,
        Err(err) => return store_failure("Failed to build dashboard", &err),
    };
    let complaints = match load_complaints(&state).await {
        Ok(complaints) => complaints,
        Err(err) => return store_failure("Failed to build dashboard", &err),
    };

    let now = Utc::now();
    let timeframe = params.timeframe.as_deref().unwrap_or("30d");
    let window_days = timeframe_days(timeframe);
    let kpis = Kpis::compute(&users, &complaints, now, window_days);

    let mut data = json!({ "overview": kpis });
    if params.include_details.as_deref() == Some("true") {
        data["details"] = json!({
            "timeline": timeline(&complaints, now, window_days),
            "geographical": geographical_breakdown(&complaints),
            "categories": category_breakdown(&complaints),
            "statusFlow": status_flow(&complaints),
            "userSegments": user_segments(&users, now),
        });
    }

    HttpResponse::Ok().json(ApiResponse::ok_with_meta(
        data,
        json!({ "timeframe": timeframe, "generated_at": now }),
    ))
}

/// `GET /api/v1/dashboard/realtime-kpis`
///
/// Current totals, today/week/month activity, efficiency rates, and
/// operational alerts.
pub async fn realtime_kpis(state: web::Data<AppState>) -> HttpResponse {
    let users = match load_users(&state).await {
        Ok(users) => users,
        Err(err) => return store_failure("Failed to build realtime KPIs", &err),
    };
    let complaints = match load_complaints(&state).await {
        Ok(complaints) => complaints,
        Err(err) => return store_failure("Failed to build realtime KPIs", &err),
    };

    let kpis = RealtimeKpis::compute(&users, &complaints, Utc::now());
    HttpResponse::Ok().json(ApiResponse::ok_with_meta(
        kpis,
        json!({ "generated_at": Utc::now() }),
    ))
}
