//! Client configuration with layered sources.
//!
//! Loading flow:
//! 1. Start with compiled [`ClientConfig::default()`]
//! 2. If a JSON file is given and exists, deep-merge its values over defaults
//! 3. Apply `TETHER_*` environment variable overrides (highest priority)

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub const ENV_DEPLOYMENT_URL: &str = "TETHER_DEPLOYMENT_URL";
pub const ENV_CLIENT_ID: &str = "TETHER_CLIENT_ID";
pub const ENV_LOG_LEVEL: &str = "TETHER_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "TETHER_LOG_JSON";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no deployment url configured (set deploymentUrl or TETHER_DEPLOYMENT_URL)")]
    MissingDeploymentUrl,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Address of the backend deployment.
    pub deployment_url: String,
    /// Identifier reported to the backend when the session opens.
    pub client_id: String,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            deployment_url: String::new(),
            client_id: default_client_id(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(deployment_url: impl Into<String>) -> Self {
        Self {
            deployment_url: deployment_url.into(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Install a tracing subscriber when the session is initialised from config.
    pub enabled: bool,
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".into(),
            json: false,
        }
    }
}

pub fn default_client_id() -> String {
    format!("tether-rust-{}", env!("CARGO_PKG_VERSION"))
}

/// Load from environment only.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    finish(serde_json::to_value(ClientConfig::default())?)
}

/// Load `path` (if it exists) over defaults, then apply env overrides.
pub fn load_config_from_path(path: &Path) -> Result<ClientConfig, ConfigError> {
    let defaults = serde_json::to_value(ClientConfig::default())?;
    let merged = if path.exists() {
        debug!(?path, "loading client config from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "client config file not found, using defaults");
        defaults
    };
    finish(merged)
}

fn finish(merged: Value) -> Result<ClientConfig, ConfigError> {
    let mut config: ClientConfig = serde_json::from_value(merged)?;
    apply_overrides(&mut config, |name| std::env::var(name).ok());
    if config.deployment_url.trim().is_empty() {
        return Err(ConfigError::MissingDeploymentUrl);
    }
    Ok(config)
}

/// Objects merge per key, everything else is replaced; nulls in `source` are skipped.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides looked up through `lookup`. Empty or unparsable values are ignored.
pub fn apply_overrides(config: &mut ClientConfig, lookup: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = read(ENV_DEPLOYMENT_URL) {
        config.deployment_url = v;
    }
    if let Some(v) = read(ENV_CLIENT_ID) {
        config.client_id = v;
    }
    if let Some(v) = read(ENV_LOG_LEVEL) {
        config.logging.level = v;
        config.logging.enabled = true;
    }
    if let Some(v) = read(ENV_LOG_JSON) {
        match parse_bool(&v) {
            Some(json) => config.logging.json = json,
            None => warn!(key = ENV_LOG_JSON, value = %v, "invalid boolean env var, ignoring"),
        }
    }
}

/// Accepts (case-insensitive) `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
