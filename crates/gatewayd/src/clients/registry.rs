//! HTTP client for the function registry (builds) and the function controller.

use async_trait::async_trait;
use gateway_core::{FunctionRecord, SkillName};
use reqwest::multipart::{Form, Part};
use tracing::debug;

use super::{probe_url, FunctionRegistryClient, RemoteResponse, TransportError};

const REGISTRY: &str = "function registry";
const CONTROLLER: &str = "function controller";
const BUILD_PATH: &str = "/v1/functions/build";
const FUNCTIONS_PATH: &str = "/v1/functions";

#[derive(Debug, Clone)]
pub struct HttpFunctionRegistryClient {
    registry_url: String,
    controller_url: String,
    http: reqwest::Client,
}

impl HttpFunctionRegistryClient {
    pub fn new(registry_url: &str, controller_url: &str, http: reqwest::Client) -> Self {
        Self {
            registry_url: registry_url.trim_end_matches('/').to_string(),
            controller_url: controller_url.trim_end_matches('/').to_string(),
            http,
        }
    }
}

#[async_trait]
impl FunctionRegistryClient for HttpFunctionRegistryClient {
    async fn build_archive(
        &self,
        name: &SkillName,
        runtime: &str,
        archive: Vec<u8>,
    ) -> Result<RemoteResponse, TransportError> {
        let url = format!("{}{}", self.registry_url, BUILD_PATH);
        debug!(%url, %name, runtime, bytes = archive.len(), "uploading function archive");

        let form = Form::new()
            .text("name", name.as_str().to_string())
            .text("runtime", runtime.to_string())
            .part("archive", Part::bytes(archive).file_name(name.as_str().to_string()));

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(REGISTRY, &url, &e))?;

        RemoteResponse::read(REGISTRY, response).await
    }

    async fn create_function(
        &self,
        record: &FunctionRecord,
    ) -> Result<RemoteResponse, TransportError> {
        let url = format!("{}{}", self.controller_url, FUNCTIONS_PATH);
        debug!(%url, name = %record.name, image = %record.image, "registering function");

        let response = self
            .http
            .post(&url)
            .json(record)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(CONTROLLER, &url, &e))?;

        RemoteResponse::read(CONTROLLER, response).await
    }

    fn image_prefix(&self) -> &str {
        &self.controller_url
    }

    async fn probe(&self) -> bool {
        let (registry, controller) = tokio::join!(
            probe_url(&self.http, &self.registry_url),
            probe_url(&self.http, &self.controller_url)
        );
        registry && controller
    }
}
