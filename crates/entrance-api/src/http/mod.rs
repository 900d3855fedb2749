//! HTTP/REST API layer.
//!
//! Axum-based REST API at `/api/v1/` exposing the build session protocol,
//! with envelope response format and CORS support.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
