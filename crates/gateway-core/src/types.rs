//! Core types for the skill gateway.
//!
//! Everything here is transient: built for one inbound request, owned by a
//! single provisioning run, and dropped once the response is written.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Runtime identifier sent with every archive build unless configured otherwise.
pub const DEFAULT_FUNCTION_RUNTIME: &str = "node-19";

/// Function schema version registered with the controller.
pub const FUNCTION_VERSION: &str = "v0.1.0";

/// Key in the intent document that always carries the skill name.
pub const INTENT_KEY: &str = "intent";

/// A skill submission that cannot be provisioned. Raised before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("the skill name is required")]
    MissingName,
    #[error("the intents_json file is required")]
    MissingIntentDefinition,
    #[error("the function_archive file is required")]
    MissingArchive,
    #[error("the intents_json file must contain a JSON object: {0}")]
    InvalidIntentDefinition(String),
}

/// Skill name shared by the NLU registry and the function registry.
///
/// Always lowercase: the function registry only accepts lowercase names, so
/// the NLU side is registered under the same normalized value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SkillName(String);

impl SkillName {
    /// Lowercase a submitted name; nothing else is altered. Blank names are
    /// rejected.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        Ok(Self(raw.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SkillName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SkillName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Intent definition as sent to the NLU registry.
///
/// The `intent` key is overwritten with the skill name, whatever the
/// uploaded file contained.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IntentDocument(Map<String, Value>);

impl IntentDocument {
    /// Decode an uploaded definition and stamp it with `name`.
    pub fn from_definition(definition: &[u8], name: &SkillName) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_slice(definition)
            .map_err(|e| ValidationError::InvalidIntentDefinition(e.to_string()))?;

        let Value::Object(mut map) = value else {
            return Err(ValidationError::InvalidIntentDefinition(format!(
                "expected an object, got {}",
                json_kind(&value)
            )));
        };

        map.insert(INTENT_KEY.to_string(), Value::String(name.as_str().to_string()));
        Ok(Self(map))
    }

    /// The intent name carried by the document.
    pub fn intent(&self) -> Option<&str> {
        self.0.get(INTENT_KEY).and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A validated skill submission: name, intent document and archive bytes.
#[derive(Debug, Clone)]
pub struct SkillRequest {
    pub name: SkillName,
    pub intents: IntentDocument,
    pub archive: Vec<u8>,
}

impl SkillRequest {
    /// Build a request from the decoded form parts.
    ///
    /// Presence is checked before content so a submission missing several
    /// parts reports the name first, then the intents, then the archive.
    pub fn from_parts(
        name: Option<&str>,
        intent_definition: Option<&[u8]>,
        archive: Option<Vec<u8>>,
    ) -> Result<Self, ValidationError> {
        let name = SkillName::parse(name.unwrap_or_default())?;
        let intent_definition = intent_definition.ok_or(ValidationError::MissingIntentDefinition)?;
        let archive = archive.ok_or(ValidationError::MissingArchive)?;
        let intents = IntentDocument::from_definition(intent_definition, &name)?;

        Ok(Self {
            name,
            intents,
            archive,
        })
    }
}

/// A build response that does not carry a usable image reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
    #[error("build response carried an empty image reference")]
    EmptyReference,
    #[error("build response object has no `image` field")]
    MissingImage,
}

/// Result of a successful archive build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    /// Content-addressed image reference, unquoted.
    pub image_ref: String,
}

impl BuildArtifact {
    /// Extract the image reference from a build response body.
    ///
    /// The registry answers with the reference as a JSON string; a JSON
    /// object with an `image` field and bare text are accepted too.
    pub fn from_body(body: &str) -> Result<Self, ArtifactError> {
        let trimmed = body.trim();

        let image_ref = match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::String(s)) => s,
            Ok(Value::Object(map)) => map
                .get("image")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(ArtifactError::MissingImage)?,
            _ => unquote(trimmed).to_string(),
        };

        let image_ref = image_ref.trim().to_string();
        if image_ref.is_empty() {
            return Err(ArtifactError::EmptyReference);
        }
        Ok(Self { image_ref })
    }

    /// Fully qualified image path: `prefix` immediately followed by the reference.
    pub fn image_path(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.image_ref)
    }
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        return &value[1..value.len() - 1];
    }
    value
}

/// Function registration submitted to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    pub image: String,
    pub version: String,
}

impl FunctionRecord {
    pub fn new(name: &SkillName, artifact: &BuildArtifact, image_prefix: &str) -> Self {
        Self {
            name: name.as_str().to_string(),
            image: artifact.image_path(image_prefix),
            version: FUNCTION_VERSION.to_string(),
        }
    }
}
