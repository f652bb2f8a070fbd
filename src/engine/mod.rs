//! Execution engine subsystem.
//!
//! # Data Flow
//! ```text
//! http::bridge (route handler)
//!     → context.rs (ContextBag: request head + reply handle)
//!     → ExecutionEngine::handle(request, context)
//!         → graphql.rs (GraphQL-over-HTTP protocol, async-graphql executor)
//!         → cors.rs (preflight + response headers)
//!     → EngineResponse (status, ordered headers, body)
//!     → http::bridge replays it onto the reply
//! ```
//!
//! # Design Decisions
//! - The bridge only sees the `ExecutionEngine` trait, never the executor
//! - Headers are an ordered list, not a map; duplicate names are separate lines
//! - Client mistakes are ordinary responses; `EngineError` is reserved for
//!   failures outside the response contract

pub mod context;
pub mod cors;
pub mod graphql;

use std::fmt;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{HeaderName, HeaderValue, Request, StatusCode};
use futures_util::stream::BoxStream;
use thiserror::Error;

pub use context::{ContextBag, RequestHead};
pub use cors::CorsPolicy;
pub use graphql::GraphQLEngine;

/// Boxed error for streamed body chunks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The query execution capability the bridge delegates to.
#[async_trait]
pub trait ExecutionEngine: Send + Sync + 'static {
    /// Path the engine expects to be served on.
    fn graphql_endpoint(&self) -> &str;

    /// Execute one HTTP exchange.
    ///
    /// `context` is made available to resolvers for the lifetime of this call.
    async fn handle(
        &self,
        request: Request<Body>,
        context: ContextBag,
    ) -> Result<EngineResponse, EngineError>;
}

/// Failure outside the engine's own response contract.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request body could not be read from the transport.
    #[error("failed to read request body: {0}")]
    Body(#[source] std::io::Error),

    /// The execution result could not be encoded.
    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Response body produced by the engine.
pub enum EngineBody {
    Empty,
    Bytes(Bytes),
    Stream(BoxStream<'static, Result<Bytes, BoxError>>),
}

impl fmt::Debug for EngineBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineBody::Empty => f.write_str("Empty"),
            EngineBody::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            EngineBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl From<Bytes> for EngineBody {
    fn from(bytes: Bytes) -> Self {
        EngineBody::Bytes(bytes)
    }
}

impl From<Vec<u8>> for EngineBody {
    fn from(bytes: Vec<u8>) -> Self {
        EngineBody::Bytes(Bytes::from(bytes))
    }
}

impl From<String> for EngineBody {
    fn from(text: String) -> Self {
        EngineBody::Bytes(Bytes::from(text))
    }
}

impl From<&'static str> for EngineBody {
    fn from(text: &'static str) -> Self {
        EngineBody::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl From<EngineBody> for Body {
    fn from(body: EngineBody) -> Self {
        match body {
            EngineBody::Empty => Body::empty(),
            EngineBody::Bytes(bytes) => Body::from(bytes),
            EngineBody::Stream(stream) => Body::from_stream(stream),
        }
    }
}

/// The engine's response value: status, ordered header lines, body.
#[derive(Debug)]
pub struct EngineResponse {
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub body: EngineBody,
}

impl EngineResponse {
    /// Empty response with the given status and no headers.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: EngineBody::Empty,
        }
    }

    /// Append a header line.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }

    /// Append several header lines in order.
    pub fn headers<I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (HeaderName, HeaderValue)>,
    {
        self.headers.extend(headers);
        self
    }

    pub fn body(mut self, body: impl Into<EngineBody>) -> Self {
        self.body = body.into();
        self
    }
}
