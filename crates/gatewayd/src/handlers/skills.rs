//! POST /v1/skills - multipart decoding and outcome encoding.
//!
//! Form parts: `name` (text), `intents_json` (file, JSON object) and
//! `function_archive` (file). Other parts are ignored.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gateway_core::{SagaOutcome, SkillRequest, ValidationError};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::server::{api_status, AppState};

pub const NAME_FIELD: &str = "name";
pub const INTENTS_FIELD: &str = "intents_json";
pub const ARCHIVE_FIELD: &str = "function_archive";

pub const SKILL_CREATED_MESSAGE: &str = "Skill created successfully";

/// A skill upload that never reaches the provisioning workflow.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid multipart request: {0}")]
    Rejected(#[from] MultipartRejection),
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// POST /v1/skills - create a skill.
pub async fn create_skill(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let req = match decode_skill_request(multipart).await {
        Ok(req) => req,
        Err(e) => {
            warn!("rejected skill upload: {}", e);
            return api_status(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let outcome = state.saga.create_skill(req).await;
    encode_outcome(&outcome)
}

/// Read the form parts into a validated request.
pub async fn decode_skill_request(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<SkillRequest, DecodeError> {
    let mut multipart = multipart?;

    let mut name = None;
    let mut intents = None;
    let mut archive = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_owned);
        match field_name.as_deref() {
            Some(NAME_FIELD) => name = Some(field.text().await?),
            Some(INTENTS_FIELD) => intents = Some(field.bytes().await?),
            Some(ARCHIVE_FIELD) => archive = Some(field.bytes().await?.to_vec()),
            _ => {}
        }
    }

    Ok(SkillRequest::from_parts(
        name.as_deref(),
        intents.as_deref(),
        archive,
    )?)
}

/// Map a provisioning outcome to the HTTP response.
///
/// Downstream rejections are passed through with their status and body;
/// everything else that failed is a 500 carrying the error message.
pub fn encode_outcome(outcome: &SagaOutcome) -> Response {
    let Some(error) = outcome.error() else {
        return api_status(StatusCode::OK, SKILL_CREATED_MESSAGE);
    };

    match error.downstream() {
        Some((status, body)) => passthrough(status, body),
        None => api_status(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

/// Echo the downstream status and body unchanged, even a 2xx that the step
/// did not accept. Only a status axum cannot represent becomes 502.
fn passthrough(status: u16, body: &str) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    let body = serde_json::from_str::<Value>(body).unwrap_or_else(|_| Value::String(body.to_string()));

    (status, Json(body)).into_response()
}
