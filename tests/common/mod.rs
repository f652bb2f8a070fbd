//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use graphql_bridge::config::BridgeConfig;
use graphql_bridge::engine::GraphQLEngine;
use graphql_bridge::lifecycle::Shutdown;
use graphql_bridge::schema::create_schema;
use graphql_bridge::HttpServer;
use tokio::net::TcpListener;

/// A bridge serving the bundled schema on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the server with `config`; the listener is bound before returning.
pub async fn start_server(config: BridgeConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let engine = Arc::new(GraphQLEngine::new(create_schema(), &config.graphql));
    let server = HttpServer::new(config, engine);
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer { addr, shutdown }
}

/// Client that never pools or proxies, so each test sees fresh connections.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
