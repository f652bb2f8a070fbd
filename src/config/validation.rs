//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges (limits > 0, timeouts > 0)
//! - Reject endpoint paths the router cannot bind literally
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BridgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::BridgeConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} '{value}': not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("graphql.endpoint '{0}' must start with '/'")]
    EndpointNotAbsolute(String),

    #[error("graphql.endpoint '{0}' must not contain route captures or wildcards")]
    EndpointHasCaptures(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    let endpoint = &config.graphql.endpoint;
    if !endpoint.starts_with('/') {
        errors.push(ValidationError::EndpointNotAbsolute(endpoint.clone()));
    }
    if endpoint.contains(['{', '}', '*', ':']) {
        errors.push(ValidationError::EndpointHasCaptures(endpoint.clone()));
    }

    if config.server.body_limit_bytes == 0 {
        errors.push(ValidationError::Zero("server.body_limit_bytes"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("server.request_timeout_secs"));
    }
    if config.graphql.max_file_size == 0 {
        errors.push(ValidationError::Zero("graphql.max_file_size"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
