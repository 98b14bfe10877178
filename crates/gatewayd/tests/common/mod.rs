//! Recording test doubles for the downstream clients.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gateway_core::{FunctionRecord, IntentDocument, SkillName};
use gatewayd::clients::{FunctionRegistryClient, NluClient, RemoteResponse, TransportError};
use gatewayd::server::{create_router, AppState};

pub const CONTROLLER_URL: &str = "http://controller:8083";
pub const IMAGE_REF: &str = "/lighton:sha256-4f2a";

/// Scripted answer for one downstream operation.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, &'static str),
    Unreachable,
}

impl Reply {
    fn answer(&self, service: &'static str) -> Result<RemoteResponse, TransportError> {
        match self {
            Self::Status(status, body) => Ok(RemoteResponse::new(*status, *body)),
            Self::Unreachable => Err(TransportError::Unreachable {
                service,
                url: "http://test".to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NluCall {
    Create(serde_json::Value),
    Delete(String),
    Query(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistryCall {
    Build {
        name: String,
        runtime: String,
        archive: Vec<u8>,
    },
    CreateFunction(FunctionRecord),
}

pub struct FakeNlu {
    pub create: Reply,
    pub delete: Reply,
    pub query: Reply,
    pub reachable: bool,
    pub calls: Mutex<Vec<NluCall>>,
}

impl Default for FakeNlu {
    fn default() -> Self {
        Self {
            create: Reply::Status(201, r#"{"intent":"created"}"#),
            delete: Reply::Status(200, ""),
            query: Reply::Status(200, r#"{"intent":"lighton"}"#),
            reachable: true,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeNlu {
    pub fn calls(&self) -> Vec<NluCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                NluCall::Delete(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn created(&self) -> Vec<serde_json::Value> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                NluCall::Create(doc) => Some(doc),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: NluCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl NluClient for FakeNlu {
    async fn create_skill(&self, doc: &IntentDocument) -> Result<RemoteResponse, TransportError> {
        self.record(NluCall::Create(serde_json::to_value(doc).unwrap()));
        self.create.answer("nlu")
    }

    async fn delete_skill(&self, name: &SkillName) -> Result<RemoteResponse, TransportError> {
        self.record(NluCall::Delete(name.as_str().to_string()));
        self.delete.answer("nlu")
    }

    async fn forward_query(&self, body: Vec<u8>) -> Result<RemoteResponse, TransportError> {
        self.record(NluCall::Query(body));
        self.query.answer("nlu")
    }

    async fn probe(&self) -> bool {
        self.reachable
    }
}

pub struct FakeRegistry {
    pub build: Reply,
    pub create_function: Reply,
    pub reachable: bool,
    pub calls: Mutex<Vec<RegistryCall>>,
}

impl Default for FakeRegistry {
    fn default() -> Self {
        Self {
            build: Reply::Status(200, "\"/lighton:sha256-4f2a\""),
            create_function: Reply::Status(201, r#"{"name":"lighton"}"#),
            reachable: true,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeRegistry {
    pub fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: RegistryCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl FunctionRegistryClient for FakeRegistry {
    async fn build_archive(
        &self,
        name: &SkillName,
        runtime: &str,
        archive: Vec<u8>,
    ) -> Result<RemoteResponse, TransportError> {
        self.record(RegistryCall::Build {
            name: name.as_str().to_string(),
            runtime: runtime.to_string(),
            archive,
        });
        self.build.answer("function registry")
    }

    async fn create_function(
        &self,
        record: &FunctionRecord,
    ) -> Result<RemoteResponse, TransportError> {
        self.record(RegistryCall::CreateFunction(record.clone()));
        self.create_function.answer("function controller")
    }

    fn image_prefix(&self) -> &str {
        CONTROLLER_URL
    }

    async fn probe(&self) -> bool {
        self.reachable
    }
}

/// Minimal zip archive (empty central directory).
pub fn zip_bytes() -> Vec<u8> {
    let mut bytes = vec![0x50, 0x4b, 0x05, 0x06];
    bytes.extend_from_slice(&[0; 18]);
    bytes
}

pub fn app_state(nlu: &Arc<FakeNlu>, registry: &Arc<FakeRegistry>) -> Arc<AppState> {
    Arc::new(AppState::new(
        Arc::clone(nlu) as Arc<dyn NluClient>,
        Arc::clone(registry) as Arc<dyn FunctionRegistryClient>,
        "node-19",
        32 * 1024 * 1024,
    ))
}

pub fn test_app(nlu: &Arc<FakeNlu>, registry: &Arc<FakeRegistry>) -> axum::Router {
    create_router(app_state(nlu, registry))
}

/// One multipart form part.
pub enum FormPart<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub const BOUNDARY: &str = "gateway-test-boundary";

/// Encode parts as a `multipart/form-data` body using [`BOUNDARY`].
pub fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            FormPart::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            FormPart::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
