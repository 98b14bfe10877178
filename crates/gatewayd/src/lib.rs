//! gatewayd - skill provisioning gateway.
//!
//! Library components for the gateway process.

pub mod clients;
pub mod handlers;
pub mod saga;
pub mod server;

use std::sync::Arc;

use clients::{HttpFunctionRegistryClient, HttpNluClient};
use gateway_core::Config;
use server::AppState;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Gateway state.
pub struct Gateway {
    config: Config,
    state: Arc<AppState>,
    shutdown: CancellationToken,
}

impl Gateway {
    /// Create a gateway backed by the HTTP clients for `config`.
    pub fn new(config: Config) -> Result<Self, GatewayError> {
        let http = clients::http_client(config.request_timeout())?;
        let nlu = Arc::new(HttpNluClient::new(&config.nlu_api_endpoint, http.clone()));
        let registry = Arc::new(HttpFunctionRegistryClient::new(
            &config.registry_api_endpoint,
            &config.controller_api_endpoint,
            http,
        ));

        let state = Arc::new(AppState::new(
            nlu,
            registry,
            &config.function_runtime,
            config.max_upload_bytes,
        ));

        Ok(Self {
            config,
            state,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Bind the listener and serve until shutdown is requested.
    pub async fn run(&self) -> Result<(), GatewayError> {
        let addr = self.config.listen_addr();
        info!("nlu endpoint: {}", self.config.nlu_api_endpoint);
        info!("function registry endpoint: {}", self.config.registry_api_endpoint);
        info!("function controller endpoint: {}", self.config.controller_api_endpoint);
        match self.config.request_timeout() {
            Some(timeout) => info!("downstream timeout: {}s", timeout.as_secs()),
            None => info!("downstream timeout: none"),
        }

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })?;

        server::serve(listener, Arc::clone(&self.state), self.shutdown.clone())
            .await
            .map_err(GatewayError::Serve)
    }

    /// Stop accepting connections and drain in-flight requests.
    pub fn shutdown(&self) {
        info!("shutdown requested");
        self.shutdown.cancel();
    }
}
