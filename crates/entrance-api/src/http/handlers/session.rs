//! Build session HTTP handlers.
//!
//! Endpoints:
//! - POST   /api/v1/sessions                                         - Start a build
//! - GET    /api/v1/sessions                                         - List sessions
//! - GET    /api/v1/sessions/{id}                                    - Get a session (read-only)
//! - POST   /api/v1/sessions/{id}/resume                             - Expire a stale interaction and drive
//! - DELETE /api/v1/sessions/{id}                                    - Delete a session
//! - GET    /api/v1/sessions/{id}/history                            - Version history
//! - POST   /api/v1/sessions/{id}/interactions/{iid}/respond         - Answer the pending interaction
//! - POST   /api/v1/sessions/{id}/interactions/{iid}/cancel          - Cancel the pending interaction
//! - POST   /api/v1/sessions/{id}/rollback                           - Roll back to a version
//!
//! Every mutating endpoint returns the session as it stands once it has
//! suspended on its next interaction or finished.

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use entrance_types::session::SessionSummary;
use entrance_types::version::ConfigVersion;

use crate::http::error::AppError;
use crate::http::handlers::{elapsed_ms, parse_uuid};
use crate::http::response::ApiResponse;
use crate::state::{AppState, SessionView};

/// Request body for starting a build.
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub goal: String,
}

/// Request body for answering an interaction.
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub action_id: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Request body for a rollback.
#[derive(Debug, Deserialize)]
pub struct RollbackRequest {
    pub target: u64,
}

/// Query parameters for session listing.
#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    /// Filter on archived (finished) sessions.
    pub archived: Option<bool>,
}

fn default_limit() -> usize {
    50
}

fn session_response(view: SessionView, request_id: String, elapsed: u64) -> ApiResponse<SessionView> {
    let id = view.session_id;
    ApiResponse::success(view, request_id, elapsed)
        .with_link("self", &format!("/api/v1/sessions/{id}"))
        .with_link("history", &format!("/api/v1/sessions/{id}/history"))
}

/// POST /api/v1/sessions - Start a build session for a goal.
pub async fn start_session(
    State(state): State<AppState>,
    Json(body): Json<StartSessionRequest>,
) -> Result<ApiResponse<SessionView>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let goal = body.goal.trim();
    if goal.is_empty() {
        return Err(AppError::Validation("goal must not be empty".to_string()));
    }

    let session = state.start_session(goal).await?;
    let view = SessionView::from(&session);

    Ok(session_response(view, request_id, elapsed_ms(start)).with_status(StatusCode::CREATED))
}

/// GET /api/v1/sessions - List sessions, most recently updated first.
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<SessionListQuery>,
) -> Result<Json<ApiResponse<Vec<SessionSummary>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sessions: Vec<SessionSummary> = state
        .list_sessions()
        .await?
        .into_iter()
        .filter(|s| query.archived.is_none_or(|archived| s.archived == archived))
        .skip(query.offset)
        .take(query.limit)
        .collect();

    Ok(Json(
        ApiResponse::success(sessions, request_id, elapsed_ms(start))
            .with_link("self", "/api/v1/sessions"),
    ))
}

/// GET /api/v1/sessions/{id} - Get a session as stored.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let session_id = parse_uuid(&id)?;

    let session = state.load_session(session_id).await?;

    Ok(Json(session_response(
        SessionView::from(&session),
        request_id,
        elapsed_ms(start),
    )))
}

/// POST /api/v1/sessions/{id}/resume - Expire a stale interaction, then
/// drive until the session suspends or finishes.
pub async fn resume_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let session_id = parse_uuid(&id)?;

    let session = state.resume_session(session_id).await?;

    Ok(Json(session_response(
        SessionView::from(&session),
        request_id,
        elapsed_ms(start),
    )))
}

/// DELETE /api/v1/sessions/{id} - Delete a session and its history.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let session_id = parse_uuid(&id)?;

    if !state.delete_session(session_id).await? {
        return Err(crate::state::SessionError::NotFound(session_id).into());
    }

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": true, "session_id": session_id }),
        request_id,
        elapsed_ms(start),
    )))
}

/// GET /api/v1/sessions/{id}/history - Every version, oldest first.
pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ConfigVersion>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let session_id = parse_uuid(&id)?;

    let history = state.history(session_id).await?;

    Ok(Json(
        ApiResponse::success(history, request_id, elapsed_ms(start))
            .with_link("session", &format!("/api/v1/sessions/{session_id}")),
    ))
}

/// POST /api/v1/sessions/{id}/interactions/{iid}/respond - Answer the pending interaction.
pub async fn respond(
    State(state): State<AppState>,
    Path((id, iid)): Path<(String, String)>,
    Json(body): Json<RespondRequest>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let session_id = parse_uuid(&id)?;
    let interaction_id = parse_uuid(&iid)?;

    let session = state
        .respond(session_id, interaction_id, &body.action_id, body.data.as_ref())
        .await?;

    Ok(Json(session_response(
        SessionView::from(&session),
        request_id,
        elapsed_ms(start),
    )))
}

/// POST /api/v1/sessions/{id}/interactions/{iid}/cancel - Cancel the pending interaction.
pub async fn cancel(
    State(state): State<AppState>,
    Path((id, iid)): Path<(String, String)>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let session_id = parse_uuid(&id)?;
    let interaction_id = parse_uuid(&iid)?;

    let session = state.cancel(session_id, interaction_id).await?;

    Ok(Json(session_response(
        SessionView::from(&session),
        request_id,
        elapsed_ms(start),
    )))
}

/// POST /api/v1/sessions/{id}/rollback - Roll the document back to a version.
pub async fn rollback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RollbackRequest>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let session_id = parse_uuid(&id)?;

    let session = state.rollback(session_id, body.target).await?;

    Ok(Json(session_response(
        SessionView::from(&session),
        request_id,
        elapsed_ms(start),
    )))
}
