//! Metrics collection and exposition.
//!
//! # Metrics
//! - `graphql_http_requests_total` (counter): requests by method, status
//! - `graphql_http_request_duration_seconds` (histogram): latency by method
//!
//! # Design Decisions
//! - Prometheus exporter runs its own HTTP listener on `metrics_address`
//! - Labels stay low-cardinality: no paths, no operation names

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "graphql_http_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "graphql_http_request_duration_seconds";

/// Install the Prometheus recorder and start its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &Method, status: StatusCode, start: Instant) {
    let method = method.as_str().to_owned();
    metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.clone(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!(REQUEST_DURATION_SECONDS, "method" => method)
        .record(start.elapsed().as_secs_f64());
}

/// Middleware recording every request that reaches the router.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let start = Instant::now();
    let response = next.run(request).await;
    record_request(&method, response.status(), start);
    response
}
