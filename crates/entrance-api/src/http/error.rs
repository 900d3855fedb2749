//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use entrance_types::error::{BuildError, InteractionError, StoreError};

use crate::http::response::ApiResponse;
use crate::state::SessionError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Session operation errors.
    Session(SessionError),
    /// Malformed request.
    Validation(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Session(e)
    }
}

impl AppError {
    /// Status, machine-readable code and message for this error.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Session(SessionError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "SESSION_NOT_FOUND",
                format!("Session {id} not found"),
            ),
            AppError::Session(SessionError::Build(e)) => build_error_parts(e),
            AppError::Session(SessionError::Corrupt(e)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CORRUPT_SESSION",
                e.to_string(),
            ),
            AppError::Session(SessionError::Repository(e)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                e.to_string(),
            ),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
        }
    }
}

fn build_error_parts(e: &BuildError) -> (StatusCode, &'static str, String) {
    let message = e.to_string();
    match e {
        BuildError::Store(StoreError::UnknownVersion(_)) => {
            (StatusCode::NOT_FOUND, "VERSION_NOT_FOUND", message)
        }
        BuildError::Store(StoreError::CorruptHistory(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "CORRUPT_SESSION", message)
        }
        BuildError::Store(StoreError::Patch(_)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_PATCH", message)
        }
        BuildError::Interaction(InteractionError::UnknownInteraction(_)) => {
            (StatusCode::NOT_FOUND, "INTERACTION_NOT_FOUND", message)
        }
        BuildError::Interaction(InteractionError::MalformedResponse(_))
        | BuildError::Interaction(InteractionError::InvalidAction { .. }) => {
            (StatusCode::BAD_REQUEST, "INVALID_RESPONSE", message)
        }
        BuildError::Interaction(_) => (StatusCode::CONFLICT, "INTERACTION_CONFLICT", message),
        BuildError::Terminal { .. } => (StatusCode::CONFLICT, "SESSION_FINISHED", message),
        BuildError::InvalidTransition { .. } => {
            (StatusCode::CONFLICT, "INVALID_TRANSITION", message)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, %message, "request failed");
        }
        ApiResponse::error(status, code, &message, Uuid::now_v7().to_string(), 0).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entrance_types::phase::BuildPhase;

    #[test]
    fn missing_session_is_404() {
        let (status, code, _) = AppError::from(SessionError::NotFound(Uuid::nil())).parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "SESSION_NOT_FOUND");
    }

    #[test]
    fn finished_session_is_conflict() {
        let err = SessionError::Build(BuildError::Terminal {
            phase: BuildPhase::Done,
        });
        let (status, code, message) = AppError::from(err).parts();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "SESSION_FINISHED");
        assert_eq!(message, "session is already done");
    }

    #[test]
    fn bad_answers_are_client_errors() {
        let err = SessionError::Build(BuildError::Interaction(
            InteractionError::MalformedResponse("expected an object".to_string()),
        ));
        assert_eq!(AppError::from(err).parts().0, StatusCode::BAD_REQUEST);

        let err = SessionError::Build(BuildError::Store(StoreError::UnknownVersion(9)));
        assert_eq!(AppError::from(err).parts().0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn response_uses_error_envelope() {
        let response = AppError::Validation("goal must not be empty".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["errors"][0]["code"], "VALIDATION_ERROR");
        assert_eq!(json["errors"][0]["message"], "goal must not be empty");
        assert!(!json["meta"]["request_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_interaction_maps_to_its_own_status() {
        let id = Uuid::now_v7();
        let err = SessionError::Build(BuildError::Interaction(
            InteractionError::UnknownInteraction(id),
        ));
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["errors"][0]["code"], "INTERACTION_NOT_FOUND");
    }
}
