//! HTTP front door for an embedded GraphQL engine.

pub mod config;
pub mod engine;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod schema;

pub use config::schema::BridgeConfig;
pub use engine::{ExecutionEngine, GraphQLEngine};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
