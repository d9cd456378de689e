use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

use crate::actions;
use crate::db::SqlitePool;
use crate::tasks::TaskRegistry;

/// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub tasks: TaskRegistry,
}

// Request logging with a short correlation id
async fn request_logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = Uuid::new_v4().to_string()[..8].to_string();
    let start_time = Instant::now();

    info!("Started {} {} [{}]", method, path, request_id);

    let response = next.run(request).await;
    let duration = start_time.elapsed();
    let status = response.status();

    metrics::histogram!("http_request_duration_seconds").record(duration.as_secs_f64());
    info!(
        "Completed {} {} [{}] {} in {:.2}ms",
        method,
        path,
        request_id,
        status.as_u16(),
        duration.as_secs_f64() * 1000.0
    );

    response
}

/// Build the read-only API router
pub fn router(state: AppState) -> Router {
    let api_router = Router::new()
        .route("/flights", get(actions::list_events))
        .route("/flights/search-by-time", get(actions::search_events_by_time))
        .route("/flights/{id}", get(actions::get_event_by_id))
        .route("/stats/summary", get(actions::get_summary))
        .route("/stats/summary-24h", get(actions::get_summary_24h))
        .route("/stats/classification", get(actions::get_classification_counts))
        .route("/stats/hourly", get(actions::get_hourly))
        .route("/stats/top-aircraft", get(actions::get_top_aircraft))
        .route("/stats/top-operators", get(actions::get_top_operators))
        .route("/stats/countries", get(actions::get_countries))
        .route("/stats/routes", get(actions::get_routes))
        .route("/status", get(actions::get_status))
        .with_state(state);

    Router::new()
        .nest("/api", api_router)
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(CorsLayer::permissive())
}

pub async fn start_web_server(
    address: String,
    state: AppState,
    cancel: CancellationToken,
) -> Result<()> {
    info!("Starting web server on {}", address);
    actions::init_server_start_time();

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind web server to {}", address))?;
    info!("Web server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("Web server failed")?;

    Ok(())
}
