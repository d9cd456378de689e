//! Status endpoint: build information, uptime, and background task health.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Instant;

use crate::tasks::TaskHealth;
use crate::web::AppState;

/// Server start time, set when the web server starts
static SERVER_START_TIME: OnceLock<Instant> = OnceLock::new();

pub fn init_server_start_time() {
    SERVER_START_TIME.get_or_init(Instant::now);
}

/// Version from `git describe`, or the package version outside a checkout
pub fn version() -> &'static str {
    option_env!("VERGEN_GIT_DESCRIBE").unwrap_or(env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo {
    pub version: &'static str,
    pub git_commit: Option<&'static str>,
    pub build_timestamp: Option<&'static str>,
    pub uptime_seconds: u64,
    pub uptime_human: String,
    /// Empty when the server runs without background tasks (`serve`)
    pub tasks: BTreeMap<String, TaskHealth>,
}

fn format_duration(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, secs)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let start_time = SERVER_START_TIME.get_or_init(Instant::now);
    let uptime_seconds = start_time.elapsed().as_secs();

    let status = StatusInfo {
        version: version(),
        git_commit: option_env!("VERGEN_GIT_SHA"),
        build_timestamp: option_env!("VERGEN_BUILD_TIMESTAMP"),
        uptime_seconds,
        uptime_human: format_duration(uptime_seconds),
        tasks: state.tasks.snapshot().await,
    };

    (StatusCode::OK, Json(status))
}
