pub mod events;
pub mod stats;
pub mod status;
pub mod views;

pub use events::*;
pub use stats::*;
pub use status::*;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: String,
}

/// JSON error body: `{ "errors": "<message>" }`
pub fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (
        status,
        Json(ErrorResponse {
            errors: message.to_string(),
        }),
    )
}

/// Clamp an optional `limit` query parameter to `1..=max`
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 100, 1000), 100);
        assert_eq!(clamp_limit(Some(5000), 100, 1000), 1000);
        assert_eq!(clamp_limit(Some(0), 100, 1000), 1);
        assert_eq!(clamp_limit(Some(-3), 10, 100), 1);
        assert_eq!(clamp_limit(Some(42), 10, 100), 42);
    }
}
