//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Sessions
        .route(
            "/sessions",
            post(handlers::session::start_session).get(handlers::session::list_sessions),
        )
        .route(
            "/sessions/{id}",
            get(handlers::session::get_session).delete(handlers::session::delete_session),
        )
        .route("/sessions/{id}/resume", post(handlers::session::resume_session))
        .route("/sessions/{id}/history", get(handlers::session::get_history))
        .route("/sessions/{id}/rollback", post(handlers::session::rollback))
        // Interactions
        .route(
            "/sessions/{id}/interactions/{iid}/respond",
            post(handlers::session::respond),
        )
        .route(
            "/sessions/{id}/interactions/{iid}/cancel",
            post(handlers::session::cancel),
        )
        // Catalog and validation
        .route("/catalog", get(handlers::catalog::list_catalog))
        .route("/validate", post(handlers::catalog::validate_document));

    Router::new()
        .nest("/api/v1", api_routes)
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
