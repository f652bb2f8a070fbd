//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the single GraphQL route
//! - Register content-type parsers (multipart passes through to the engine)
//! - Wire up middleware (request ID, tracing, metrics, timeout)
//! - Serve on a bound listener until shutdown is signalled

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Span;

use crate::config::BridgeConfig;
use crate::engine::ExecutionEngine;
use crate::http::bridge::graphql_bridge;
use crate::http::content_type::{parse_body, ContentTypeParsers, PassThrough};
use crate::http::request::{request_id, UuidRequestId};
use crate::http::response::not_found;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn ExecutionEngine>,
}

/// HTTP front door for one execution engine.
pub struct HttpServer {
    router: Router,
    config: BridgeConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and engine.
    pub fn new(config: BridgeConfig, engine: Arc<dyn ExecutionEngine>) -> Self {
        let mut parsers = ContentTypeParsers::with_defaults(config.server.body_limit_bytes);
        // The engine reads multipart bodies itself.
        parsers.add("multipart/form-data", PassThrough);

        let router = Self::build_router(&config, engine, parsers);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &BridgeConfig,
        engine: Arc<dyn ExecutionEngine>,
        parsers: ContentTypeParsers,
    ) -> Router {
        let endpoint = engine.graphql_endpoint().to_string();
        tracing::info!(endpoint = %endpoint, "Binding GraphQL route");

        let graphql = get(graphql_bridge)
            .post(graphql_bridge)
            .options(graphql_bridge)
            .route_layer(middleware::from_fn_with_state(
                Arc::new(parsers),
                parse_body,
            ))
            .fallback(not_found);

        Router::new()
            .route(&endpoint, graphql)
            .fallback(not_found)
            .with_state(AppState { engine })
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(middleware::from_fn(metrics::track_requests))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.server.request_timeout_secs,
                    ))),
            )
    }

    /// The fully layered router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            body_limit = self.config.server.body_limit_bytes,
            "HTTP server starting"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn request_span(request: &Request<Body>) -> Span {
    let request_id = request_id(request).unwrap_or_default();
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}
