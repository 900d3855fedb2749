//! HTTP request handlers for the REST API.

pub mod catalog;
pub mod session;

use std::time::Instant;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;

/// Parse a UUID from a path parameter, returning a 400 error on invalid format.
pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    s.parse::<Uuid>()
        .map_err(|_| AppError::Validation(format!("Invalid UUID: {s}")))
}

/// Milliseconds since `start`, for the response envelope.
pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Fallback for unknown routes.
pub async fn not_found() -> impl IntoResponse {
    ApiResponse::error(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        "No such route",
        Uuid::now_v7().to_string(),
        0,
    )
}
