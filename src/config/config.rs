use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::store::StoreConfig;
use crate::error::{Error, Result};

/// Prefix for environment overrides, e.g. `RENALTRACK_API__BASE_URL`.
pub const ENV_PREFIX: &str = "RENALTRACK_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: the API the client talks to, where tokens live, and logging.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub api: ApiConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the REST API lives and how long calls against it may take.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
    #[serde(default = "default_timeout_in_ms")]
    pub refresh_timeout_in_ms: u64,
}

fn default_timeout_in_ms() -> u64 {
    10_000
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        ApiConfig {
            base_url: base_url.into(),
            timeout_in_ms: default_timeout_in_ms(),
            refresh_timeout_in_ms: default_timeout_in_ms(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_in_ms)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_in_ms)
    }

    /// Joins an endpoint such as `/auth/me` onto the base URL.
    pub fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

/// Load config from a YAML file, with `RENALTRACK_`-prefixed environment overrides on top.
pub fn load_config(path: impl AsRef<Path>) -> Result<ConfigV1> {
    let figment = Figment::new()
        .merge(Yaml::file(path.as_ref()))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));
    extract(figment)
}

/// Parse config from an in-memory YAML document. No environment overrides are applied.
pub fn parse_config(yaml: &str) -> Result<ConfigV1> {
    extract(Figment::new().merge(Yaml::string(yaml)))
}

fn extract(figment: Figment) -> Result<ConfigV1> {
    let config = figment
        .extract::<Config>()
        .map_err(|e| Error::Config(e.to_string()))?;
    match config {
        Config::ConfigV1(c) => Ok(c),
    }
}

/// Render the JSON schema for the configuration.
pub fn config_schema() -> Result<String> {
    let schema = schema_for!(Config);
    serde_json::to_string_pretty(&schema).map_err(|e| Error::Config(e.to_string()))
}
