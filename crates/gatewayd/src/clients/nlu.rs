//! HTTP client for the NLU registry.

use async_trait::async_trait;
use gateway_core::{IntentDocument, SkillName};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use tracing::debug;

use super::{probe_url, NluClient, RemoteResponse, TransportError};

const SERVICE: &str = "nlu";
const SKILLS_PATH: &str = "/v1/skills";
const QUERY_PATH: &str = "/v1/nlu";

#[derive(Debug, Clone)]
pub struct HttpNluClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpNluClient {
    pub fn new(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl NluClient for HttpNluClient {
    async fn create_skill(&self, doc: &IntentDocument) -> Result<RemoteResponse, TransportError> {
        let url = format!("{}{}", self.base_url, SKILLS_PATH);
        debug!(%url, intent = ?doc.intent(), "registering skill with nlu");

        let response = self
            .http
            .post(&url)
            .json(doc)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(SERVICE, &url, &e))?;

        RemoteResponse::read(SERVICE, response).await
    }

    async fn delete_skill(&self, name: &SkillName) -> Result<RemoteResponse, TransportError> {
        let url = format!("{}{}/{}", self.base_url, SKILLS_PATH, name);
        debug!(%url, "deleting nlu skill");

        let response = self
            .http
            .delete(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(SERVICE, &url, &e))?;

        RemoteResponse::read(SERVICE, response).await
    }

    async fn forward_query(&self, body: Vec<u8>) -> Result<RemoteResponse, TransportError> {
        let url = format!("{}{}", self.base_url, QUERY_PATH);
        debug!(%url, bytes = body.len(), "forwarding nlu query");

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(SERVICE, &url, &e))?;

        RemoteResponse::read(SERVICE, response).await
    }

    async fn probe(&self) -> bool {
        probe_url(&self.http, &self.base_url).await
    }
}
