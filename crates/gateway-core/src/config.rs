//! Gateway configuration.
//!
//! Precedence: CLI flags > `POLYXIA_GATEWAY_*` environment >
//! `polyxia-gateway.yaml` > defaults. The YAML file is looked up in
//! `/etc/polyxia-gateway` then the working directory unless an explicit path
//! is given. `morty_api_endpoint` is accepted as the registry endpoint key.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::DEFAULT_FUNCTION_RUNTIME;

pub const CONFIG_FILE_NAME: &str = "polyxia-gateway.yaml";
pub const CONFIG_SEARCH_DIRS: [&str; 2] = ["/etc/polyxia-gateway", "."];
pub const ENV_PREFIX: &str = "POLYXIA_GATEWAY_";

pub const DEFAULT_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_NLU_API_ENDPOINT: &str = "http://localhost:8082";
pub const DEFAULT_REGISTRY_API_ENDPOINT: &str = "http://localhost:8081";
pub const DEFAULT_CONTROLLER_API_ENDPOINT: &str = "http://localhost:8083";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;
pub const DEFAULT_SHUTDOWN_GRACE_SEC: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid integer value for {key}: {value}")]
    InvalidInt { key: String, value: String },
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Listener
    pub addr: String,
    pub port: u16,

    // Downstream services
    pub nlu_api_endpoint: String,
    #[serde(alias = "morty_api_endpoint")]
    pub registry_api_endpoint: String,
    /// Also the prefix of registered image paths.
    pub controller_api_endpoint: String,

    // Provisioning
    pub function_runtime: String,
    /// Per-request timeout for downstream calls. `0` disables the timeout,
    /// which is the default: a hung downstream call blocks its request.
    pub request_timeout_sec: u64,
    pub max_upload_bytes: usize,

    pub shutdown_grace_sec: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            port: DEFAULT_PORT,
            nlu_api_endpoint: DEFAULT_NLU_API_ENDPOINT.to_string(),
            registry_api_endpoint: DEFAULT_REGISTRY_API_ENDPOINT.to_string(),
            controller_api_endpoint: DEFAULT_CONTROLLER_API_ENDPOINT.to_string(),
            function_runtime: DEFAULT_FUNCTION_RUNTIME.to_string(),
            request_timeout_sec: 0,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            shutdown_grace_sec: DEFAULT_SHUTDOWN_GRACE_SEC,
        }
    }
}

impl Config {
    /// Load defaults, then the config file, then the process environment.
    ///
    /// An explicit `path` must exist; without one, a missing file is fine.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path.map(Path::to_path_buf).or_else(Self::discover) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.normalize()?;
        Ok(config)
    }

    /// Find `polyxia-gateway.yaml` in the standard locations.
    pub fn discover() -> Option<PathBuf> {
        CONFIG_SEARCH_DIRS
            .iter()
            .map(|dir| Path::new(dir).join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Load config from a YAML file, merging with defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_yaml(&content, &path.display().to_string())
    }

    fn parse_yaml(content: &str, source: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: source.to_string(),
            source: e,
        })
    }

    /// Apply `POLYXIA_GATEWAY_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(std::env::vars())
    }

    /// Apply `POLYXIA_GATEWAY_*` variables from an explicit set of pairs.
    pub fn apply_env_from<I, K, V>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in vars {
            let Some(key) = name.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            self.apply_value(&key.to_ascii_lowercase(), value.as_ref().trim())?;
        }
        Ok(())
    }

    /// Apply a single config value. Unknown keys are ignored.
    fn apply_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "addr" => self.addr = value.to_string(),
            "port" => self.port = parse_int(key, value)?,
            "nlu_api_endpoint" => self.nlu_api_endpoint = value.to_string(),
            "registry_api_endpoint" | "morty_api_endpoint" => {
                self.registry_api_endpoint = value.to_string();
            }
            "controller_api_endpoint" => self.controller_api_endpoint = value.to_string(),
            "function_runtime" => self.function_runtime = value.to_string(),
            "request_timeout_sec" => self.request_timeout_sec = parse_int(key, value)?,
            "max_upload_bytes" => self.max_upload_bytes = parse_int(key, value)?,
            "shutdown_grace_sec" => self.shutdown_grace_sec = parse_int(key, value)?,
            _ => {}
        }
        Ok(())
    }

    /// Trim trailing slashes from endpoints and reject empty values.
    pub fn normalize(&mut self) -> Result<(), ConfigError> {
        for (key, endpoint) in [
            ("nlu_api_endpoint", &mut self.nlu_api_endpoint),
            ("registry_api_endpoint", &mut self.registry_api_endpoint),
            ("controller_api_endpoint", &mut self.controller_api_endpoint),
        ] {
            let trimmed = endpoint.trim().trim_end_matches('/');
            if trimmed.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: "endpoint must not be empty".to_string(),
                });
            }
            *endpoint = trimmed.to_string();
        }

        if self.function_runtime.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "function_runtime".to_string(),
                reason: "runtime must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Downstream request timeout; `None` means wait indefinitely.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_sec > 0).then(|| Duration::from_secs(self.request_timeout_sec))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_sec)
    }

    /// `addr:port` for the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

fn parse_int<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidInt {
        key: key.to_string(),
        value: value.to_string(),
    })
}
