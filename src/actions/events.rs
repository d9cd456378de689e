use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::error;

use crate::actions::views::EventView;
use crate::actions::{clamp_limit, json_error};
use crate::events_repo::EventsRepository;
use crate::web::AppState;

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 1000;
const DEFAULT_SEARCH_LIMIT: i64 = 10;
const MAX_SEARCH_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TimeSearchParams {
    pub datetime: Option<String>,
    pub limit: Option<i64>,
}

/// Parse a search target: RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]`
/// (a space separator is accepted too) taken as UTC
pub fn parse_target_time(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// GET /api/flights
pub async fn list_events(
    Query(params): Query<ListParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let repo = EventsRepository::new(state.pool.clone());
    match repo.list(limit, offset).await {
        Ok(events) => {
            let views: Vec<EventView> = events.into_iter().map(EventView::from).collect();
            Json(views).into_response()
        }
        Err(e) => {
            error!("Failed to list events: {:#}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list flights").into_response()
        }
    }
}

/// GET /api/flights/{id}
pub async fn get_event_by_id(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let repo = EventsRepository::new(state.pool.clone());
    match repo.get_by_id(id).await {
        Ok(Some(event)) => Json(EventView::from(event)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "Flight not found").into_response(),
        Err(e) => {
            error!("Failed to get event {}: {:#}", id, e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to get flight").into_response()
        }
    }
}

/// GET /api/flights/search-by-time
///
/// The events seen closest to `datetime`, nearest first
pub async fn search_events_by_time(
    Query(params): Query<TimeSearchParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Some(raw) = params.datetime.as_deref().filter(|s| !s.trim().is_empty()) else {
        return json_error(StatusCode::BAD_REQUEST, "datetime parameter is required")
            .into_response();
    };
    let Some(target) = parse_target_time(raw) else {
        return json_error(
            StatusCode::BAD_REQUEST,
            &format!("Invalid datetime format: '{}'", raw),
        )
        .into_response();
    };
    let limit = clamp_limit(params.limit, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT);

    let repo = EventsRepository::new(state.pool.clone());
    match repo.search_by_time(target, limit).await {
        Ok(events) => {
            let views: Vec<EventView> = events
                .into_iter()
                .map(|e| EventView::from(e).with_time_diff(target))
                .collect();
            Json(views).into_response()
        }
        Err(e) => {
            error!("Failed to search events by time: {:#}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to search flights")
                .into_response()
        }
    }
}
