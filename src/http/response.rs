//! Server-generated responses.
//!
//! Responses the server produces on its own (unknown routes, body parsing
//! failures) use one JSON shape: `{"statusCode", "error", "message"}`.
//! Everything on the GraphQL endpoint comes from the engine instead.

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    error: &'static str,
    message: String,
}

/// A server error response with the canonical reason phrase as `error`.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        status_code: status.as_u16(),
        error: status.canonical_reason().unwrap_or("Unknown"),
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

/// Fallback for every path and method not bound to the engine.
pub async fn not_found(request: Request) -> Response {
    tracing::debug!(method = %request.method(), path = %request.uri().path(), "No route matched");
    error_response(
        StatusCode::NOT_FOUND,
        format!("Route {}:{} not found", request.method(), request.uri().path()),
    )
}
