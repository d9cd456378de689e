use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::actions::{clamp_limit, json_error};
use crate::stats::RecentSummary;
use crate::stats_repo::StatsRepository;
use crate::web::AppState;

const DEFAULT_TOP_LIMIT: i64 = 10;
const MAX_TOP_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct TopParams {
    pub limit: Option<i64>,
}

fn respond<T: Serialize>(what: &str, result: anyhow::Result<T>) -> Response {
    metrics::counter!("stats.api.requests_total", "endpoint" => what.to_string()).increment(1);
    match result {
        Ok(data) => Json(data).into_response(),
        Err(e) => {
            metrics::counter!("stats.api.errors_total").increment(1);
            error!("Failed to get {}: {:#}", what, e);
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Failed to get {}", what),
            )
            .into_response()
        }
    }
}

/// GET /api/stats/summary
pub async fn get_summary(State(state): State<AppState>) -> impl IntoResponse {
    let repo = StatsRepository::new(state.pool.clone());
    respond("summary", repo.summary(None).await)
}

/// GET /api/stats/summary-24h
pub async fn get_summary_24h(State(state): State<AppState>) -> impl IntoResponse {
    let repo = StatsRepository::new(state.pool.clone());
    let since = Utc::now() - Duration::hours(24);
    respond(
        "summary-24h",
        repo.summary(Some(since)).await.map(RecentSummary::from),
    )
}

/// GET /api/stats/classification
pub async fn get_classification_counts(State(state): State<AppState>) -> impl IntoResponse {
    let repo = StatsRepository::new(state.pool.clone());
    respond("classification", repo.classification_counts().await)
}

/// GET /api/stats/hourly
pub async fn get_hourly(State(state): State<AppState>) -> impl IntoResponse {
    let repo = StatsRepository::new(state.pool.clone());
    respond("hourly", repo.hourly().await)
}

/// GET /api/stats/top-aircraft
pub async fn get_top_aircraft(
    Query(params): Query<TopParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let limit = clamp_limit(params.limit, DEFAULT_TOP_LIMIT, MAX_TOP_LIMIT);
    let repo = StatsRepository::new(state.pool.clone());
    respond("top-aircraft", repo.top_aircraft(limit).await)
}

/// GET /api/stats/top-operators
pub async fn get_top_operators(
    Query(params): Query<TopParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let limit = clamp_limit(params.limit, DEFAULT_TOP_LIMIT, MAX_TOP_LIMIT);
    let repo = StatsRepository::new(state.pool.clone());
    respond("top-operators", repo.top_operators(limit).await)
}

/// GET /api/stats/countries
pub async fn get_countries(
    Query(params): Query<TopParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let limit = clamp_limit(params.limit, DEFAULT_TOP_LIMIT, MAX_TOP_LIMIT);
    let repo = StatsRepository::new(state.pool.clone());
    respond("countries", repo.countries(limit).await)
}

/// GET /api/stats/routes
pub async fn get_routes(
    Query(params): Query<TopParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let limit = clamp_limit(params.limit, DEFAULT_TOP_LIMIT, MAX_TOP_LIMIT);
    let repo = StatsRepository::new(state.pool.clone());
    respond("routes", repo.routes(limit).await)
}
