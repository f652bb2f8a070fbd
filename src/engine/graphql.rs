//! GraphQL-over-HTTP engine backed by an `async_graphql::Executor`.
//!
//! # Responsibilities
//! - Read operations from the query string (GET), JSON bodies and
//!   multipart upload requests (POST)
//! - Answer CORS preflights and serve GraphiQL to browsers
//! - Inject the per-request `ContextBag` into resolver data
//! - Encode the execution result with resolver-set headers and cache hints
//!
//! Request-level mistakes (unparsable params, GET mutations, oversized
//! uploads) become error-shaped responses rather than `EngineError`s.

use std::io;

use async_graphql::http::{
    parse_query_string, receive_batch_body, GraphiQLSource, MultipartOptions,
};
use async_graphql::parser::parse_query;
use async_graphql::parser::types::{DocumentOperations, OperationType};
use async_graphql::{BatchRequest, BatchResponse, Executor, ParseRequestError, Value};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use futures_util::TryStreamExt;
use serde_json::json;

use crate::config::GraphQLConfig;
use crate::engine::{ContextBag, CorsPolicy, EngineError, EngineResponse, ExecutionEngine};
use crate::http::content_type::ParsedBody;

const GRAPHQL_RESPONSE_JSON: &str = "application/graphql-response+json";
const APPLICATION_JSON: &str = "application/json";

/// Why a request never reached the executor.
enum Rejection {
    Client(EngineResponse),
    Engine(EngineError),
}

/// Serves an executor (usually an `async_graphql::Schema`) over HTTP.
pub struct GraphQLEngine<E> {
    executor: E,
    endpoint: String,
    graphiql: bool,
    batching: bool,
    multipart: MultipartOptions,
    cors: CorsPolicy,
}

impl<E: Executor> GraphQLEngine<E> {
    pub fn new(executor: E, config: &GraphQLConfig) -> Self {
        Self {
            executor,
            endpoint: config.endpoint.clone(),
            graphiql: config.graphiql,
            batching: config.batching,
            multipart: MultipartOptions::default()
                .max_file_size(config.max_file_size)
                .max_num_files(config.max_num_files),
            cors: CorsPolicy::from_config(&config.cors),
        }
    }

    async fn respond(
        &self,
        parts: &Parts,
        body: Body,
        context: ContextBag,
    ) -> Result<EngineResponse, EngineError> {
        if parts.method == Method::GET
            && self.graphiql
            && accepts_html(&parts.headers)
            && !has_query_param(parts.uri.query())
        {
            tracing::debug!("Serving GraphiQL");
            return Ok(self.graphiql_page());
        }

        let batch = match self.read_operations(parts, body).await {
            Ok(batch) => batch,
            Err(Rejection::Client(response)) => return Ok(response),
            Err(Rejection::Engine(err)) => return Err(err),
        };

        if matches!(batch, BatchRequest::Batch(_)) && !self.batching {
            return Ok(request_error(
                StatusCode::BAD_REQUEST,
                "Batched requests are not enabled",
            ));
        }

        let response = self.executor.execute_batch(batch.data(context)).await;

        let content_type = negotiate_content_type(&parts.headers);
        // application/json keeps 200 for every result; the newer media type
        // reports operations that never executed as client errors.
        let status = if content_type == GRAPHQL_RESPONSE_JSON && !executed(&response) {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::OK
        };

        let mut out = EngineResponse::new(status)
            .header(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        if response.is_ok() {
            if let Some(value) = response
                .cache_control()
                .value()
                .and_then(|cc| HeaderValue::from_str(&cc).ok())
            {
                out = out.header(header::CACHE_CONTROL, value);
            }
        }
        out = out.headers(response.http_headers_iter());

        let body = serde_json::to_vec(&response)?;
        Ok(out.body(body))
    }

    async fn read_operations(&self, parts: &Parts, body: Body) -> Result<BatchRequest, Rejection> {
        match parts.method {
            Method::GET => {
                if !has_query_param(parts.uri.query()) {
                    return Err(bad_request("Missing query".to_string()));
                }
                let request = parse_query_string(parts.uri.query().unwrap_or_default())
                    .map_err(|err| bad_request(err.to_string()))?;
                if selects_mutation(&request) {
                    return Err(Rejection::Client(
                        request_error(
                            StatusCode::METHOD_NOT_ALLOWED,
                            "Can only perform a mutation operation from a POST request",
                        )
                        .header(header::ALLOW, HeaderValue::from_static("POST")),
                    ));
                }
                Ok(BatchRequest::Single(request))
            }
            Method::POST => match parts.extensions.get::<ParsedBody>() {
                Some(ParsedBody::Json(value)) => serde_json::from_value(value.clone())
                    .map_err(|err| bad_request(format!("Invalid GraphQL request: {err}"))),
                Some(ParsedBody::Text(text)) => serde_json::from_str(text)
                    .map_err(|err| bad_request(format!("Invalid GraphQL request: {err}"))),
                None => self.receive_body(parts, body).await,
            },
            _ => Err(Rejection::Client(
                request_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
                    .header(header::ALLOW, HeaderValue::from_static("GET, POST, OPTIONS")),
            )),
        }
    }

    /// Read the raw body, including multipart upload requests.
    async fn receive_body(&self, parts: &Parts, body: Body) -> Result<BatchRequest, Rejection> {
        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let reader = body
            .into_data_stream()
            .map_err(io::Error::other)
            .into_async_read();

        receive_batch_body(content_type, reader, self.multipart.clone())
            .await
            .map_err(|err| match err {
                ParseRequestError::PayloadTooLarge => Rejection::Client(request_error(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "Payload too large",
                )),
                ParseRequestError::Io(err) => Rejection::Engine(EngineError::Body(err)),
                other => bad_request(other.to_string()),
            })
    }

    fn graphiql_page(&self) -> EngineResponse {
        let page = GraphiQLSource::build().endpoint(&self.endpoint).finish();
        EngineResponse::new(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            )
            .body(page)
    }
}

#[async_trait]
impl<E: Executor> ExecutionEngine for GraphQLEngine<E> {
    fn graphql_endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn handle(
        &self,
        request: Request<Body>,
        context: ContextBag,
    ) -> Result<EngineResponse, EngineError> {
        let (parts, body) = request.into_parts();

        if parts.method == Method::OPTIONS {
            return Ok(EngineResponse::new(StatusCode::NO_CONTENT)
                .headers(self.cors.preflight_headers(&parts.headers)));
        }

        let response = self.respond(&parts, body, context).await?;
        if response.status.is_client_error() {
            tracing::debug!(status = %response.status, "GraphQL request rejected");
        }
        Ok(response.headers(self.cors.response_headers(&parts.headers)))
    }
}

/// JSON error body in the GraphQL response shape.
fn request_error(status: StatusCode, message: impl Into<String>) -> EngineResponse {
    let body = json!({ "errors": [{ "message": message.into() }] });
    EngineResponse::new(status)
        .header(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON))
        .body(body.to_string())
}

fn bad_request(message: String) -> Rejection {
    Rejection::Client(request_error(StatusCode::BAD_REQUEST, message))
}

/// Whether `accept` lists `media_type` with a non-zero quality.
fn accepts(headers: &HeaderMap, media_type: &str) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|entry| {
            let mut params = entry.split(';');
            let range = params.next().unwrap_or_default().trim();
            range.eq_ignore_ascii_case(media_type) && !params.any(is_zero_quality)
        })
}

fn is_zero_quality(param: &str) -> bool {
    let Some((name, value)) = param.split_once('=') else {
        return false;
    };
    name.trim().eq_ignore_ascii_case("q")
        && value.trim().parse::<f32>().is_ok_and(|q| q <= 0.0)
}

/// False when a single operation failed to parse or validate.
///
/// Such responses carry `data: null` and only errors without a path; field
/// errors during execution always have one.
fn executed(response: &BatchResponse) -> bool {
    match response {
        BatchResponse::Single(response) => {
            !(matches!(response.data, Value::Null)
                && !response.errors.is_empty()
                && response.errors.iter().all(|err| err.path.is_empty()))
        }
        BatchResponse::Batch(_) => true,
    }
}

fn accepts_html(headers: &HeaderMap) -> bool {
    accepts(headers, "text/html")
}

fn negotiate_content_type(headers: &HeaderMap) -> &'static str {
    if accepts(headers, GRAPHQL_RESPONSE_JSON) {
        GRAPHQL_RESPONSE_JSON
    } else {
        APPLICATION_JSON
    }
}

fn has_query_param(query: Option<&str>) -> bool {
    query.is_some_and(|q| q.split('&').any(|pair| pair.starts_with("query=")))
}

/// Whether the operation a request would run is a mutation.
fn selects_mutation(request: &async_graphql::Request) -> bool {
    let Ok(document) = parse_query(&request.query) else {
        return false;
    };
    match &document.operations {
        DocumentOperations::Single(operation) => operation.node.ty == OperationType::Mutation,
        DocumentOperations::Multiple(operations) => match request.operation_name.as_deref() {
            Some(name) => operations
                .iter()
                .any(|(op_name, op)| op_name.as_str() == name && op.node.ty == OperationType::Mutation),
            None => false,
        },
    }
}
