//! Deferred-send reply handle.
//!
//! # Responsibilities
//! - Collect status and header lines before the body is known
//! - Terminate the exchange exactly once with `send`
//! - Hand the finished reply back to axum as a `Response`
//!
//! # Design Decisions
//! - Header lines are kept in a `Vec`, so interleaved duplicates keep their
//!   original order (a `HeaderMap` groups values by name)
//! - Cloneable handle: the bridge and resolvers (via `ContextBag`) share one reply
//! - Status is last-write-wins; writes after `send` are rejected

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use thiserror::Error;

/// Violations of the reply contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReplyError {
    #[error("reply was already sent")]
    AlreadySent,

    #[error("reply was never sent")]
    NotSent,

    #[error("reply was already turned into a response")]
    Consumed,
}

struct ReplyState {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Option<Body>,
    sent: bool,
}

/// Mutable reply for one exchange.
#[derive(Clone)]
pub struct Reply {
    state: Arc<Mutex<ReplyState>>,
}

impl Reply {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ReplyState {
                status: StatusCode::OK,
                headers: Vec::new(),
                body: None,
                sent: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReplyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the status code. Repeated calls overwrite.
    pub fn status(&self, status: StatusCode) -> Result<&Self, ReplyError> {
        let mut state = self.lock();
        if state.sent {
            return Err(ReplyError::AlreadySent);
        }
        state.status = status;
        Ok(self)
    }

    /// Append a header line. Existing lines with the same name are kept.
    pub fn header(&self, name: HeaderName, value: HeaderValue) -> Result<&Self, ReplyError> {
        let mut state = self.lock();
        if state.sent {
            return Err(ReplyError::AlreadySent);
        }
        state.headers.push((name, value));
        Ok(self)
    }

    /// Terminate the exchange with `body`.
    pub fn send(&self, body: impl Into<Body>) -> Result<(), ReplyError> {
        let mut state = self.lock();
        if state.sent {
            return Err(ReplyError::AlreadySent);
        }
        state.body = Some(body.into());
        state.sent = true;
        Ok(())
    }

    pub fn is_sent(&self) -> bool {
        self.lock().sent
    }

    pub fn status_code(&self) -> StatusCode {
        self.lock().status
    }

    /// Header lines in the order they were added.
    pub fn header_lines(&self) -> Vec<(HeaderName, HeaderValue)> {
        self.lock().headers.clone()
    }

    /// Build the response for the routing layer.
    pub fn into_response(self) -> Result<Response, ReplyError> {
        let mut state = self.lock();
        if !state.sent {
            return Err(ReplyError::NotSent);
        }
        let body = state.body.take().ok_or(ReplyError::Consumed)?;

        let mut headers = HeaderMap::with_capacity(state.headers.len());
        for (name, value) in state.headers.drain(..) {
            headers.append(name, value);
        }

        let mut response = Response::new(body);
        *response.status_mut() = state.status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

impl Default for Reply {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Reply")
            .field("status", &state.status)
            .field("headers", &state.headers.len())
            .field("sent", &state.sent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::header;

    #[test]
    fn status_is_last_write_wins() {
        let reply = Reply::new();
        reply.status(StatusCode::CREATED).unwrap();
        reply.status(StatusCode::ACCEPTED).unwrap();
        assert_eq!(reply.status_code(), StatusCode::ACCEPTED);
    }

    #[test]
    fn interleaved_duplicates_keep_order() {
        let reply = Reply::new();
        reply
            .header(header::SET_COOKIE, HeaderValue::from_static("a=1"))
            .unwrap()
            .header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .unwrap()
            .header(header::SET_COOKIE, HeaderValue::from_static("b=2"))
            .unwrap();

        let lines: Vec<_> = reply
            .header_lines()
            .into_iter()
            .map(|(n, v)| format!("{}: {}", n, v.to_str().unwrap()))
            .collect();
        assert_eq!(
            lines,
            ["set-cookie: a=1", "content-type: text/plain", "set-cookie: b=2"]
        );
    }

    #[test]
    fn writes_after_send_are_rejected() {
        let reply = Reply::new();
        reply.send("first").unwrap();

        assert_eq!(reply.send("second"), Err(ReplyError::AlreadySent));
        assert_eq!(
            reply.status(StatusCode::IM_A_TEAPOT).map(|_| ()),
            Err(ReplyError::AlreadySent)
        );
        assert_eq!(
            reply
                .header(header::ETAG, HeaderValue::from_static("x"))
                .map(|_| ()),
            Err(ReplyError::AlreadySent)
        );
    }

    #[test]
    fn unsent_reply_has_no_response() {
        assert_eq!(Reply::new().into_response().err(), Some(ReplyError::NotSent));
    }

    #[test]
    fn response_consumed_once() {
        let reply = Reply::new();
        reply.send(Body::empty()).unwrap();
        let other = reply.clone();
        assert!(reply.into_response().is_ok());
        assert_eq!(other.into_response().err(), Some(ReplyError::Consumed));
    }

    #[tokio::test]
    async fn response_carries_everything() {
        let reply = Reply::new();
        reply
            .header(header::SET_COOKIE, HeaderValue::from_static("a=1"))
            .unwrap()
            .header(header::SET_COOKIE, HeaderValue::from_static("b=2"))
            .unwrap()
            .status(StatusCode::NOT_FOUND)
            .unwrap();
        reply.send("missing").unwrap();

        let response = reply.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let cookies: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, ["a=1", "b=2"]);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"missing");
    }
}
