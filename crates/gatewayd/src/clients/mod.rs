//! Clients for the downstream services.
//!
//! Each client is a thin transport adapter: it sends one request per call,
//! never retries, and hands the raw status and body back to the caller.

mod nlu;
mod registry;

pub use nlu::HttpNluClient;
pub use registry::HttpFunctionRegistryClient;

use std::time::Duration;

use async_trait::async_trait;
use gateway_core::{FunctionRecord, IntentDocument, SkillName};
use thiserror::Error;

/// No HTTP response was received from a downstream service.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{service} unreachable at {url}: {message}")]
    Unreachable {
        service: &'static str,
        url: String,
        message: String,
    },
    #[error("{service} request to {url} timed out")]
    TimedOut { service: &'static str, url: String },
    #[error("failed to read {service} response: {message}")]
    Body {
        service: &'static str,
        message: String,
    },
}

impl TransportError {
    fn from_reqwest(service: &'static str, url: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimedOut {
                service,
                url: url.to_string(),
            }
        } else {
            Self::Unreachable {
                service,
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Raw downstream answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: String,
}

impl RemoteResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    async fn read(service: &'static str, response: reqwest::Response) -> Result<Self, TransportError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TransportError::Body {
            service,
            message: e.to_string(),
        })?;
        Ok(Self { status, body })
    }
}

/// NLU registry operations.
#[async_trait]
pub trait NluClient: Send + Sync {
    /// POST /v1/skills with the intent document as JSON.
    async fn create_skill(&self, doc: &IntentDocument) -> Result<RemoteResponse, TransportError>;

    /// DELETE /v1/skills/{name}.
    async fn delete_skill(&self, name: &SkillName) -> Result<RemoteResponse, TransportError>;

    /// POST /v1/nlu with a raw JSON body.
    async fn forward_query(&self, body: Vec<u8>) -> Result<RemoteResponse, TransportError>;

    /// Whether the service answers HTTP at all.
    async fn probe(&self) -> bool;
}

/// Function registry and controller operations.
#[async_trait]
pub trait FunctionRegistryClient: Send + Sync {
    /// POST /v1/functions/build as multipart with `name`, `runtime` and `archive`.
    async fn build_archive(
        &self,
        name: &SkillName,
        runtime: &str,
        archive: Vec<u8>,
    ) -> Result<RemoteResponse, TransportError>;

    /// POST /v1/functions on the controller.
    async fn create_function(
        &self,
        record: &FunctionRecord,
    ) -> Result<RemoteResponse, TransportError>;

    /// Prefix for fully qualified image paths (the controller endpoint).
    fn image_prefix(&self) -> &str;

    /// Whether both the registry and the controller answer HTTP.
    async fn probe(&self) -> bool;
}

/// Shared HTTP client. `timeout` of `None` leaves requests unbounded.
pub fn http_client(timeout: Option<Duration>) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}

/// Any HTTP answer counts as reachable.
async fn probe_url(http: &reqwest::Client, url: &str) -> bool {
    http.get(url).send().await.is_ok()
}
