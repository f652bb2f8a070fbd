//! HTTP front door for the execution engine.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, metrics, timeout)
//!     → content_type.rs (parse or pass through the body by content type)
//!     → bridge.rs (build context, call the engine)
//!     → reply.rs (replay engine headers, status and body)
//!     → Send to client
//! ```
//!
//! Paths and methods the engine is not bound to get a `response.rs` 404.

pub mod bridge;
pub mod content_type;
pub mod reply;
pub mod request;
pub mod response;
pub mod server;

pub use bridge::{graphql_bridge, replay, BridgeError};
pub use content_type::{ContentTypeParser, ContentTypeParsers, ParsedBody, PassThrough};
pub use reply::{Reply, ReplyError};
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
