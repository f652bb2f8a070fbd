//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the GraphQL bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// HTTP server behaviour (body limits, timeouts).
    pub server: ServerConfig,

    /// GraphQL endpoint and engine protocol settings.
    pub graphql: GraphQLConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:4000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Maximum size of a body the server buffers for its own parsers.
    ///
    /// Pass-through content types (multipart) are not subject to this limit;
    /// the engine enforces its own upload limits.
    pub body_limit_bytes: usize,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            body_limit_bytes: 1024 * 1024, // 1 MiB
            request_timeout_secs: 30,
        }
    }
}

/// GraphQL engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GraphQLConfig {
    /// Path the engine is served on. The bridge binds exactly this path.
    pub endpoint: String,

    /// Serve the GraphiQL IDE to browsers on GET.
    pub graphiql: bool,

    /// Accept JSON arrays of operations in a single POST.
    pub batching: bool,

    /// Maximum size of a single uploaded file, in bytes.
    pub max_file_size: usize,

    /// Maximum number of files in one multipart request.
    pub max_num_files: usize,

    /// Cross-origin resource sharing policy.
    pub cors: CorsConfig,
}

impl Default for GraphQLConfig {
    fn default() -> Self {
        Self {
            endpoint: "/graphql".to_string(),
            graphiql: true,
            batching: false,
            max_file_size: 10 * 1024 * 1024,
            max_num_files: 10,
            cors: CorsConfig::default(),
        }
    }
}

/// CORS configuration for the GraphQL endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Emit CORS headers at all.
    pub enabled: bool,

    /// Allowed origins. Empty means any origin is echoed back.
    pub allowed_origins: Vec<String>,

    /// Send `access-control-allow-credentials: true`.
    pub allow_credentials: bool,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: Vec::new(),
            allow_credentials: true,
            max_age_secs: 600,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_port_4000() {
        let config = BridgeConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:4000");
        assert_eq!(config.graphql.endpoint, "/graphql");
        assert_eq!(config.server.body_limit_bytes, 1_048_576);
    }

    #[test]
    fn minimal_toml_fills_defaults() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [graphql]
            endpoint = "/api"
            batching = true

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.graphql.endpoint, "/api");
        assert!(config.graphql.batching);
        assert!(config.graphql.graphiql);
        assert!(config.graphql.cors.enabled);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.listener.bind_address, "0.0.0.0:4000");
    }

    #[test]
    fn cors_origins_parse() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [graphql.cors]
            allowed_origins = ["https://app.example.com"]
            allow_credentials = false
            "#,
        )
        .unwrap();

        assert_eq!(
            config.graphql.cors.allowed_origins,
            vec!["https://app.example.com".to_string()]
        );
        assert!(!config.graphql.cors.allow_credentials);
        assert_eq!(config.graphql.cors.max_age_secs, 600);
    }
}
