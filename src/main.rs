//! GraphQL HTTP bridge.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http::server (request id, trace, metrics, timeout)
//!                        │
//!                        ▼
//!                    http::content_type (json/text parsed, multipart passed through)
//!                        │
//!                        ▼
//!                    http::bridge ──▶ engine (GraphQL over HTTP, schema)
//!                        │                 │
//!                        ▼                 ▼
//!     Client Response ◀── http::reply ◀── EngineResponse (status, headers, body)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use graphql_bridge::config::{load_config, BridgeConfig, ConfigError};
use graphql_bridge::config::validation::validate_config;
use graphql_bridge::engine::GraphQLEngine;
use graphql_bridge::lifecycle::{bind_listener, Shutdown};
use graphql_bridge::observability::{logging, metrics};
use graphql_bridge::schema::create_schema;
use graphql_bridge::HttpServer;

#[derive(Parser)]
#[command(name = "graphql-bridge")]
#[command(about = "Serve a GraphQL engine over HTTP", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`
    #[arg(short, long)]
    bind: Option<String>,
}

fn load(cli: &Cli) -> Result<BridgeConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("graphql-bridge: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("graphql-bridge: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        endpoint = %config.graphql.endpoint,
        bind_address = %config.listener.bind_address,
        "graphql-bridge starting"
    );

    let listener = match bind_listener(&config.listener).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start server");
            return ExitCode::FAILURE;
        }
    };

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let engine = Arc::new(GraphQLEngine::new(create_schema(), &config.graphql));
    let server = HttpServer::new(config, engine);

    let shutdown = Shutdown::new();
    let _signals = shutdown.trigger_on_signal();

    if let Err(e) = server.run(listener, shutdown.subscribe()).await {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
