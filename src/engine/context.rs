//! Per-request context handed to the engine and its resolvers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Method, Request, Uri, Version};

use crate::http::reply::Reply;
use crate::http::request::request_id;

/// Snapshot of the inbound request head.
///
/// The body stays with the request that is passed to the engine; resolvers
/// only get the transport metadata.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    /// Value of `x-request-id`, if the request carries one.
    pub request_id: Option<String>,
    /// Peer address when the server was started with connect info.
    pub remote_addr: Option<SocketAddr>,
}

impl RequestHead {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            version: request.version(),
            headers: request.headers().clone(),
            request_id: request_id(request),
            remote_addr: request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        }
    }
}

/// Transport-level request and reply, injected into resolver context data.
///
/// Built once per request and never stored beyond it.
#[derive(Debug, Clone)]
pub struct ContextBag {
    request: Arc<RequestHead>,
    reply: Reply,
}

impl ContextBag {
    pub fn new<B>(request: &Request<B>, reply: Reply) -> Self {
        Self {
            request: Arc::new(RequestHead::from_request(request)),
            reply,
        }
    }

    pub fn request(&self) -> &RequestHead {
        &self.request
    }

    pub fn reply(&self) -> &Reply {
        &self.reply
    }
}
