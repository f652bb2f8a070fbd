//! Content-type parsers run before the route handler.
//!
//! # Responsibilities
//! - Keep a registry of parsers keyed by media type essence
//! - Buffer and parse bodies of registered types (JSON, plain text)
//! - Let pass-through types reach the handler with the body stream untouched
//! - Reject bodies with unknown types (415), oversized bodies (413) and
//!   unparsable bodies (400)
//!
//! # Design Decisions
//! - Parsed bodies keep their raw bytes; the parsed value rides along as a
//!   `ParsedBody` request extension
//! - GET and HEAD bodies, and requests without a body, are never parsed

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::LengthLimitError;
use thiserror::Error;

use crate::http::response::error_response;

/// Body value produced by a parser, attached to the request as an extension.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(serde_json::Value),
    Text(String),
}

#[derive(Debug, Error)]
pub enum BodyParseError {
    #[error("Body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Body is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Parser for one content type.
pub trait ContentTypeParser: Send + Sync + 'static {
    /// Whether the body is buffered before `parse` runs.
    fn buffers_body(&self) -> bool {
        true
    }

    fn parse(&self, payload: &Bytes) -> Result<Option<ParsedBody>, BodyParseError>;
}

pub struct JsonParser;

impl ContentTypeParser for JsonParser {
    fn parse(&self, payload: &Bytes) -> Result<Option<ParsedBody>, BodyParseError> {
        Ok(Some(ParsedBody::Json(serde_json::from_slice(payload)?)))
    }
}

pub struct TextParser;

impl ContentTypeParser for TextParser {
    fn parse(&self, payload: &Bytes) -> Result<Option<ParsedBody>, BodyParseError> {
        Ok(Some(ParsedBody::Text(std::str::from_utf8(payload)?.to_owned())))
    }
}

/// Accepts any payload, reads nothing, yields nothing.
pub struct PassThrough;

impl ContentTypeParser for PassThrough {
    fn buffers_body(&self) -> bool {
        false
    }

    fn parse(&self, _payload: &Bytes) -> Result<Option<ParsedBody>, BodyParseError> {
        Ok(None)
    }
}

/// Registered parsers plus the buffering limit.
pub struct ContentTypeParsers {
    parsers: HashMap<String, Arc<dyn ContentTypeParser>>,
    body_limit: usize,
}

impl ContentTypeParsers {
    /// Empty registry.
    pub fn new(body_limit: usize) -> Self {
        Self {
            parsers: HashMap::new(),
            body_limit,
        }
    }

    /// Registry with `application/json` and `text/plain`.
    pub fn with_defaults(body_limit: usize) -> Self {
        let mut parsers = Self::new(body_limit);
        parsers
            .add("application/json", JsonParser)
            .add("text/plain", TextParser);
        parsers
    }

    /// Register `parser` for `content_type`, replacing any existing one.
    pub fn add(&mut self, content_type: &str, parser: impl ContentTypeParser) -> &mut Self {
        self.parsers.insert(essence(content_type), Arc::new(parser));
        self
    }

    /// Parser for a `content-type` header value (parameters ignored).
    pub fn find(&self, content_type: &str) -> Option<Arc<dyn ContentTypeParser>> {
        self.parsers.get(&essence(content_type)).cloned()
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit
    }
}

/// Lower-cased media type without parameters: `Text/Plain; charset=x` → `text/plain`.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn has_body(method: &Method, headers: &HeaderMap) -> bool {
    if *method == Method::GET || *method == Method::HEAD {
        return false;
    }
    content_length(headers).is_some_and(|len| len > 0)
        || headers.contains_key(header::TRANSFER_ENCODING)
}

/// Middleware applying the registry to a request.
pub async fn parse_body(
    State(parsers): State<Arc<ContentTypeParsers>>,
    request: Request,
    next: Next,
) -> Response {
    if !has_body(request.method(), request.headers()) {
        return next.run(request).await;
    }

    let Some(content_type) = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
    else {
        return error_response(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported Media Type: missing content-type",
        );
    };

    let Some(parser) = parsers.find(&content_type) else {
        tracing::debug!(content_type = %content_type, "No parser registered");
        return error_response(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("Unsupported Media Type: {content_type}"),
        );
    };

    if !parser.buffers_body() {
        tracing::debug!(content_type = %content_type, "Passing body through unparsed");
        return next.run(request).await;
    }

    let limit = parsers.body_limit();
    if content_length(request.headers()).is_some_and(|len| len > limit) {
        return error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large");
    }

    let (mut parts, body) = request.into_parts();
    let payload = match to_bytes(body, limit).await {
        Ok(payload) => payload,
        Err(err) => {
            let err = err.into_inner();
            if err.downcast_ref::<LengthLimitError>().is_some() {
                return error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large");
            }
            tracing::warn!(error = %err, "Failed to read request body");
            return error_response(StatusCode::BAD_REQUEST, "Failed to read request body");
        }
    };

    match parser.parse(&payload) {
        Ok(Some(parsed)) => {
            parts.extensions.insert(parsed);
        }
        Ok(None) => {}
        Err(err) => {
            tracing::debug!(error = %err, content_type = %content_type, "Body rejected");
            return error_response(StatusCode::BAD_REQUEST, err.to_string());
        }
    }

    next.run(Request::from_parts(parts, Body::from(payload))).await
}
