//! CORS headers for the GraphQL endpoint.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::config::CorsConfig;

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const DEFAULT_ALLOWED_HEADERS: &str = "content-type";

/// Computes CORS response headers from the request's `origin`.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    enabled: bool,
    allowed_origins: Vec<String>,
    allow_credentials: bool,
    max_age_secs: u64,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Self {
        Self {
            enabled: config.enabled,
            allowed_origins: config.allowed_origins.clone(),
            allow_credentials: config.allow_credentials,
            max_age_secs: config.max_age_secs,
        }
    }

    /// The `access-control-allow-origin` value, or `None` if the origin is refused.
    fn allow_origin(&self, request: &HeaderMap) -> Option<HeaderValue> {
        if !self.enabled {
            return None;
        }
        match request.get(header::ORIGIN) {
            None if self.allowed_origins.is_empty() => Some(HeaderValue::from_static("*")),
            None => None,
            Some(origin) if self.allowed_origins.is_empty() => Some(origin.clone()),
            Some(origin) => {
                let origin_str = origin.to_str().ok()?;
                self.allowed_origins
                    .iter()
                    .any(|allowed| allowed == origin_str)
                    .then(|| origin.clone())
            }
        }
    }

    /// Headers added to every non-preflight response.
    pub fn response_headers(&self, request: &HeaderMap) -> Vec<(HeaderName, HeaderValue)> {
        let Some(origin) = self.allow_origin(request) else {
            return Vec::new();
        };

        let wildcard = origin == "*";
        let mut headers = vec![(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin)];
        if self.allow_credentials && !wildcard {
            headers.push((
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            ));
        }
        if !wildcard {
            headers.push((header::VARY, HeaderValue::from_static("Origin")));
        }
        headers
    }

    /// Headers for an `OPTIONS` preflight answer.
    pub fn preflight_headers(&self, request: &HeaderMap) -> Vec<(HeaderName, HeaderValue)> {
        let mut headers = self.response_headers(request);
        if headers.is_empty() {
            return headers;
        }

        headers.push((
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ));
        let requested = request
            .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ALLOWED_HEADERS));
        headers.push((header::ACCESS_CONTROL_ALLOW_HEADERS, requested));
        headers.push((
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from(self.max_age_secs),
        ));
        headers
    }
}
