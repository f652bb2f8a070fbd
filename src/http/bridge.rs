//! The GraphQL route handler: server request in, engine response replayed out.
//!
//! # Responsibilities
//! - Build the per-request `ContextBag` (request head + reply handle)
//! - Hand the untouched request to the engine and await it
//! - Replay the engine's headers (in order, appended), status and body onto
//!   the reply, then return the sent reply to the router
//!
//! # Design Decisions
//! - Engine responses are replayed verbatim, error-shaped ones included
//! - An engine failure or reply contract violation drops the partially built
//!   reply and answers 500 instead

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::engine::{ContextBag, EngineError, EngineResponse};
use crate::http::reply::{Reply, ReplyError};
use crate::http::server::AppState;

/// Handler failure, turned into a 500 by `IntoResponse`.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("engine failed: {0}")]
    Engine(#[from] EngineError),

    #[error("reply failed: {0}")]
    Reply(#[from] ReplyError),
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "GraphQL request failed");
        let body = json!({ "errors": [{ "message": "Unexpected error." }] });
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body.to_string(),
        )
            .into_response()
    }
}

/// Route handler bound to the engine endpoint for GET, POST and OPTIONS.
pub async fn graphql_bridge(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, BridgeError> {
    let reply = Reply::new();
    let context = ContextBag::new(&request, reply.clone());

    let response = state.engine.handle(request, context).await?;
    tracing::debug!(
        status = %response.status,
        headers = response.headers.len(),
        "Engine responded"
    );

    replay(response, &reply)?;
    Ok(reply.into_response()?)
}

/// Copy an engine response onto a reply: headers in order, then status, then body.
pub fn replay(response: EngineResponse, reply: &Reply) -> Result<(), ReplyError> {
    let EngineResponse {
        status,
        headers,
        body,
    } = response;

    for (name, value) in headers {
        reply.header(name, value)?;
    }
    reply.status(status)?;
    reply.send(Body::from(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Bytes};
    use axum::http::{HeaderName, Method};
    use axum::routing::get;
    use axum::Router;
    use futures_util::stream;
    use tower::ServiceExt;

    use crate::engine::{BoxError, EngineBody, ExecutionEngine};

    fn lines(reply: &Reply) -> Vec<(String, String)> {
        reply
            .header_lines()
            .into_iter()
            .map(|(n, v)| (n.to_string(), v.to_str().unwrap().to_string()))
            .collect()
    }

    #[tokio::test]
    async fn replays_headers_in_order_with_duplicates() {
        let pairs = [
            ("set-cookie", "a=1"),
            ("content-type", "application/json"),
            ("set-cookie", "b=2"),
            ("x-trace", "t"),
            ("set-cookie", "c=3"),
        ];
        let mut response = EngineResponse::new(StatusCode::OK);
        for (n, v) in pairs {
            response = response.header(
                HeaderName::from_static(n),
                HeaderValue::from_static(v),
            );
        }

        let reply = Reply::new();
        replay(response, &reply).unwrap();

        let expected: Vec<_> = pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();
        assert_eq!(lines(&reply), expected);
    }

    #[tokio::test]
    async fn zero_headers_and_empty_body_still_send() {
        let reply = Reply::new();
        replay(EngineResponse::new(StatusCode::NO_CONTENT), &reply).unwrap();

        assert!(reply.is_sent());
        assert!(lines(&reply).is_empty());
        let response = reply.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn status_codes_are_copied() {
        for code in [100u16, 200, 201, 204, 301, 400, 404, 418, 500, 503, 599] {
            let status = StatusCode::from_u16(code).unwrap();
            let reply = Reply::new();
            replay(EngineResponse::new(status), &reply).unwrap();
            assert_eq!(reply.status_code(), status);
        }
    }

    #[tokio::test]
    async fn bodies_are_byte_identical() {
        let large: Vec<u8> = (0..256 * 1024).map(|i| (i % 251) as u8).collect();
        let streamed = EngineBody::Stream(Box::pin(stream::iter(vec![
            Ok::<_, BoxError>(Bytes::from_static(b"chunk-1,")),
            Ok(Bytes::from_static(b"chunk-2")),
        ])));

        let cases: Vec<(EngineBody, Vec<u8>)> = vec![
            (EngineBody::Empty, Vec::new()),
            (EngineBody::from("small"), b"small".to_vec()),
            (EngineBody::from(large.clone()), large),
            (streamed, b"chunk-1,chunk-2".to_vec()),
        ];

        for (body, expected) in cases {
            let reply = Reply::new();
            replay(EngineResponse::new(StatusCode::OK).body(body), &reply).unwrap();
            let response = reply.into_response().unwrap();
            let sent = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(sent.to_vec(), expected);
        }
    }

    #[tokio::test]
    async fn replay_onto_sent_reply_fails() {
        let reply = Reply::new();
        reply.send("early").unwrap();
        let err = replay(EngineResponse::new(StatusCode::OK), &reply).unwrap_err();
        assert_eq!(err, ReplyError::AlreadySent);
    }

    /// Engine that echoes what it was given, or fails on demand.
    struct FakeEngine {
        fail: bool,
    }

    #[async_trait]
    impl ExecutionEngine for FakeEngine {
        fn graphql_endpoint(&self) -> &str {
            "/graphql"
        }

        async fn handle(
            &self,
            request: Request<Body>,
            context: ContextBag,
        ) -> Result<EngineResponse, EngineError> {
            if self.fail {
                return Err(EngineError::Body(std::io::Error::other("connection reset")));
            }
            assert_eq!(context.request().method, request.method());
            let raw = to_bytes(request.into_body(), usize::MAX).await.unwrap();
            Ok(EngineResponse::new(StatusCode::ACCEPTED)
                .header(header::SET_COOKIE, HeaderValue::from_static("one=1"))
                .header(header::SET_COOKIE, HeaderValue::from_static("two=2"))
                .body(raw))
        }
    }

    fn router(fail: bool) -> Router {
        let state = AppState {
            engine: Arc::new(FakeEngine { fail }),
        };
        Router::new()
            .route("/graphql", get(graphql_bridge).post(graphql_bridge))
            .with_state(state)
    }

    #[tokio::test]
    async fn handler_returns_replayed_reply() {
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/graphql")
            .body(Body::from("payload"))
            .unwrap();

        let response = router(false).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let cookies: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, ["one=1", "two=2"]);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"payload");
    }

    #[tokio::test]
    async fn engine_failure_is_500_without_engine_headers() {
        let request = axum::http::Request::get("/graphql").body(Body::empty()).unwrap();

        let response = router(true).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"errors":[{"message":"Unexpected error."}]}"#);
    }
}
