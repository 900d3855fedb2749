//! Tool catalog and stand-alone validation handlers.
//!
//! Endpoints:
//! - GET  /api/v1/catalog  - Tools skills may bind
//! - POST /api/v1/validate - Validate a configuration document

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use uuid::Uuid;

use entrance_types::agent::AgentConfiguration;
use entrance_types::catalog::CatalogTool;
use entrance_types::validation::ValidationReport;

use crate::http::error::AppError;
use crate::http::handlers::elapsed_ms;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/catalog - List the tool catalog.
pub async fn list_catalog(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CatalogTool>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let tools = state.catalog.list();

    Ok(Json(
        ApiResponse::success(tools, request_id, elapsed_ms(start))
            .with_link("self", "/api/v1/catalog"),
    ))
}

/// POST /api/v1/validate - Validate a document without starting a session.
pub async fn validate_document(
    State(state): State<AppState>,
    Json(document): Json<AgentConfiguration>,
) -> Result<Json<ApiResponse<ValidationReport>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let report = state.validate(&document);

    Ok(Json(ApiResponse::success(
        report,
        request_id,
        elapsed_ms(start),
    )))
}
