//! Unified search across users and complaints, plus suggestions and
//! autocomplete for the search box.
//!
//! Matching is in-memory substring search over the snapshots with a small
//! hand-tuned scoring model: prefix hits beat substring hits, secondary
//! fields add a little, and stale complaints lose a little.

use actix_web::{HttpResponse, http::StatusCode, web};
use chrono::Utc;
use civic_map_complaint_models::{ComplaintRecord, UserRecord, categorize};
use civic_map_server_models::{
    ApiResponse, AutocompleteItem, Pagination, SearchItem, SearchParams, SearchSummary,
    Suggestion, SuggestionParams,
};
use serde_json::json;

use crate::AppState;
use crate::handlers::{load_complaints, load_users, respond_error, store_failure};

/// Shortest accepted query.
const MIN_QUERY_LEN: usize = 2;

/// Default and maximum page sizes.
const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 50;

/// Terms the search box offers before the user has typed anything
/// distinctive, in the language of the source data.
const COMMON_TERMS: &[&str] = &[
    "buraco",
    "iluminação",
    "lixo",
    "esgoto",
    "calçada",
    "asfalto",
    "entulho",
    "árvore",
];

fn score_user(user: &UserRecord, query: &str) -> f64 {
    let name = user.full_name.to_lowercase();
    let email = user.email.to_lowercase();

    let mut score = if name.starts_with(query) {
        10.0
    } else if name.contains(query) {
        5.0
    } else {
        0.0
    };
    if email.contains(query) {
        score += 3.0;
    }
    if score <= 0.0 {
        return 0.0;
    }

    if user.verified {
        score += 2.0;
    }
    score += f64::from(user.complaints_count.min(5));
    score
}

fn score_complaint(complaint: &ComplaintRecord, query: &str, now: chrono::DateTime<Utc>) -> f64 {
    let description = complaint.description.to_lowercase();
    let mut score = if description.starts_with(query) {
        10.0
    } else if description.contains(query) {
        5.0
    } else {
        0.0
    };

    let address = &complaint.address;
    let address_hit = [&address.street, &address.district, &address.city]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(query));
    if address_hit {
        score += 3.0;
    }
    if score <= 0.0 {
        return 0.0;
    }

    if complaint.image_url.is_some() {
        score += 2.0;
    }
    if let Some(created_at) = complaint.created_at {
        #[allow(clippy::cast_precision_loss)]
        let days = (now - created_at).num_days().max(0) as f64;
        score -= (days * 0.05).min(3.0);
    }
    score.max(0.1)
}

fn user_item(user: &UserRecord, score: f64) -> SearchItem {
    SearchItem {
        kind: "user".to_string(),
        id: user.uid.clone(),
        title: user.full_name.clone(),
        subtitle: user.email.clone(),
        description: format!("{} complaints", user.complaints_count),
        image_url: user.photo_url.clone(),
        created_at: user.created_at,
        relevance_score: score,
        url: format!("/users/{}", user.uid),
        data: json!({ "verified": user.verified }),
    }
}

fn complaint_item(complaint: &ComplaintRecord, score: f64) -> SearchItem {
    let mut title = complaint.description.clone();
    if title.chars().count() > 60 {
        title = title.chars().take(60).collect::<String>() + "...";
    }
    let subtitle = [
        complaint.address.street.as_deref(),
        complaint.address.district.as_deref(),
        complaint.address.city.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ");

    SearchItem {
        kind: "complaint".to_string(),
        id: complaint.id.clone(),
        title,
        subtitle,
        description: complaint.description.clone(),
        image_url: complaint.thumbnail_url.clone(),
        created_at: complaint.created_at,
        relevance_score: score,
        url: format!("/complaints/{}", complaint.id),
        data: json!({
            "status": complaint.status().value(),
            "district": complaint.address.district,
            "category": categorize(&complaint.description).to_string(),
        }),
    }
}

/// `GET /api/v1/search`
///
/// Searches users and complaints in one pass, scored and paginated.
pub async fn unified(state: web::Data<AppState>, params: web::Query<SearchParams>) -> HttpResponse {
    let query = params.q.as_deref().unwrap_or("").trim().to_lowercase();
    if query.chars().count() < MIN_QUERY_LEN {
        return respond_error(
            StatusCode::BAD_REQUEST,
            "Search query must be at least 2 characters",
        );
    }

    let kind = params.kind.as_deref().unwrap_or("all");
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let page = params.page.unwrap_or(1).max(1);
    let now = Utc::now();

    let mut items: Vec<SearchItem> = Vec::new();
    let mut user_hits = 0usize;
    let mut complaint_hits = 0usize;

    if kind == "users" || kind == "all" {
        let users = match load_users(&state).await {
            Ok(users) => users,
            Err(err) => return store_failure("Search failed", &err),
        };
        for user in users.iter().filter(|u| !u.deleted) {
            let score = score_user(user, &query);
            if score > 0.0 {
                user_hits += 1;
                items.push(user_item(user, score));
            }
        }
    }

    if kind == "complaints" || kind == "all" {
        let complaints = match load_complaints(&state).await {
            Ok(complaints) => complaints,
            Err(err) => return store_failure("Search failed", &err),
        };
        for complaint in complaints.iter().filter(|c| !c.deleted) {
            let score = score_complaint(complaint, &query, now);
            if score > 0.0 {
                complaint_hits += 1;
                items.push(complaint_item(complaint, score));
            }
        }
    }

    match params.sort_by.as_deref().unwrap_or("relevance") {
        "date" => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        "alphabetical" => items.sort_by(|a, b| a.title.cmp(&b.title)),
        _ => items.sort_by(|a, b| {
            b.relevance_score
                .total_cmp(&a.relevance_score)
                .then_with(|| a.id.cmp(&b.id))
        }),
    }

    let summary = SearchSummary {
        total: items.len(),
        users: user_hits,
        complaints: complaint_hits,
    };
    let pagination = Pagination::new(page, limit, items.len());
    let (start, end) = pagination.slice_bounds();
    let page_items: Vec<SearchItem> = items.drain(..).skip(start).take(end - start).collect();

    HttpResponse::Ok().json(ApiResponse::ok_with_meta(
        page_items,
        json!({
            "query": params.q,
            "type": kind,
            "pagination": pagination,
            "summary": summary,
        }),
    ))
}

/// `GET /api/v1/search/suggestions`
///
/// Typed suggestions for the search box: known locations plus common
/// report terms, optionally narrowed by a prefix.
pub async fn suggestions(
    state: web::Data<AppState>,
    params: web::Query<SuggestionParams>,
) -> HttpResponse {
    let prefix = params.q.as_deref().unwrap_or("").trim().to_lowercase();
    let kind = params.kind.as_deref().unwrap_or("all");
    let limit = params.limit.unwrap_or(10).clamp(1, 20);

    let mut suggestions: Vec<Suggestion> = Vec::new();

    if kind == "locations" || kind == "all" {
        let complaints = match load_complaints(&state).await {
            Ok(complaints) => complaints,
            Err(err) => return store_failure("Failed to build suggestions", &err),
        };
        let mut places: Vec<String> = complaints
            .iter()
            .filter(|c| !c.deleted)
            .filter_map(|c| c.address.district.clone())
            .filter(|d| !d.is_empty())
            .collect();
        places.sort();
        places.dedup();
        suggestions.extend(
            places
                .into_iter()
                .filter(|place| prefix.is_empty() || place.to_lowercase().starts_with(&prefix))
                .map(|place| Suggestion {
                    kind: "location".to_string(),
                    text: place,
                    category: "District".to_string(),
                }),
        );
    }

    if kind == "terms" || kind == "all" {
        suggestions.extend(
            COMMON_TERMS
                .iter()
                .filter(|term| prefix.is_empty() || term.starts_with(&prefix))
                .map(|term| Suggestion {
                    kind: "term".to_string(),
                    text: (*term).to_string(),
                    category: categorize(term).to_string(),
                }),
        );
    }

    suggestions.truncate(limit);
    let total = suggestions.len();
    HttpResponse::Ok().json(ApiResponse::ok_with_meta(
        suggestions,
        json!({ "query": params.q, "total": total }),
    ))
}

/// `GET /api/v1/search/autocomplete`
///
/// Prefix completion over cities, districts, and common terms.
pub async fn autocomplete(
    state: web::Data<AppState>,
    params: web::Query<SuggestionParams>,
) -> HttpResponse {
    let prefix = params.q.as_deref().unwrap_or("").trim().to_lowercase();
    if prefix.is_empty() {
        return respond_error(StatusCode::BAD_REQUEST, "Query is required");
    }
    let limit = params.limit.unwrap_or(10).clamp(1, 20);

    let complaints = match load_complaints(&state).await {
        Ok(complaints) => complaints,
        Err(err) => return store_failure("Failed to autocomplete", &err),
    };

    let mut items: Vec<AutocompleteItem> = Vec::new();

    let mut push_places = |kind: &str, places: Vec<String>| {
        let mut places = places;
        places.sort();
        places.dedup();
        items.extend(
            places
                .into_iter()
                .filter(|place| place.to_lowercase().starts_with(&prefix))
                .map(|place| AutocompleteItem {
                    kind: kind.to_string(),
                    text: place.clone(),
                    value: place,
                }),
        );
    };

    push_places(
        "city",
        complaints
            .iter()
            .filter(|c| !c.deleted)
            .filter_map(|c| c.address.city.clone())
            .filter(|v| !v.is_empty())
            .collect(),
    );
    push_places(
        "district",
        complaints
            .iter()
            .filter(|c| !c.deleted)
            .filter_map(|c| c.address.district.clone())
            .filter(|v| !v.is_empty())
            .collect(),
    );

    items.extend(
        COMMON_TERMS
            .iter()
            .filter(|term| term.starts_with(&prefix))
            .map(|term| AutocompleteItem {
                kind: "term".to_string(),
                text: (*term).to_string(),
                value: (*term).to_string(),
            }),
    );

    items.truncate(limit);
    let total = items.len();
    HttpResponse::Ok().json(ApiResponse::ok_with_meta(
        items,
        json!({ "query": params.q, "total": total }),
    ))
}
