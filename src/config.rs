//! Configuration management for ran-query.
//!
//! Handles loading configuration from TOML files and environment variables:
//! where the query service lives, which dataset and output location queries
//! use, how long to wait for them, and the tables the setup routine creates.

use crate::error::{QueryError, Result};
use crate::query::{PollPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::schema::TableDefinition;
use crate::service::athena::{AthenaConfig, MAX_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Query service connection settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Defaults applied to every query.
    #[serde(default)]
    pub query: QueryConfig,

    /// External tables created by `ranq setup`.
    #[serde(default)]
    pub tables: Vec<TableDefinition>,
}

/// Query service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Endpoint URL. Derived from the region when unset.
    pub endpoint: Option<String>,

    /// Service region (e.g., "ap-south-1").
    pub region: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Bearer token for the signing proxy (not recommended to store in config).
    pub auth_token: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: None,
            timeout_secs: default_timeout_secs(),
            auth_token: None,
        }
    }
}

/// Defaults applied to every query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Dataset queries run in.
    pub database: Option<String>,

    /// Where the service writes results (e.g., "s3://bucket/query-results/").
    pub output_location: Option<String>,

    /// Delay between polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Polls before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Rows requested per result page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            database: None,
            output_location: None,
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            page_size: default_page_size(),
        }
    }
}

impl QueryConfig {
    /// Returns the poll policy described by this config.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.poll_interval_ms),
            self.max_attempts,
        )
    }

    /// Returns the output location, validated as an absolute URI.
    pub fn require_output_location(&self) -> Result<&str> {
        let location = self.output_location.as_deref().ok_or_else(|| {
            QueryError::config("output_location is required (set [query].output_location or RANQ_OUTPUT_LOCATION)")
        })?;
        validate_location(location)?;
        Ok(location)
    }

    /// Returns the dataset, or an error naming how to set it.
    pub fn require_database(&self) -> Result<&str> {
        self.database.as_deref().ok_or_else(|| {
            QueryError::config("database is required (set [query].database or RANQ_DATABASE)")
        })
    }
}

/// Checks that a location is an absolute URI such as `s3://bucket/prefix/`.
pub fn validate_location(location: &str) -> Result<()> {
    let url = Url::parse(location)
        .map_err(|e| QueryError::config(format!("Invalid location '{location}': {e}")))?;
    if url.host_str().is_none() {
        return Err(QueryError::config(format!(
            "Invalid location '{location}': missing bucket or host"
        )));
    }
    Ok(())
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ran-query")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| QueryError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            QueryError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies environment variables as defaults for unset values.
    pub fn apply_env_defaults(&mut self) {
        self.apply_defaults_from(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_defaults_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.service.endpoint.is_none() {
            self.service.endpoint = var("RANQ_ENDPOINT");
        }
        if self.service.region.is_none() {
            self.service.region = var("AWS_REGION");
        }
        if self.service.auth_token.is_none() {
            self.service.auth_token = var("RANQ_AUTH_TOKEN");
        }
        if self.query.database.is_none() {
            self.query.database = var("RANQ_DATABASE");
        }
        if self.query.output_location.is_none() {
            self.query.output_location = var("RANQ_OUTPUT_LOCATION");
        }
    }

    /// Builds the HTTP client configuration.
    pub fn athena_config(&self) -> Result<AthenaConfig> {
        let endpoint = match (&self.service.endpoint, &self.service.region) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(region)) => AthenaConfig::regional_endpoint(region),
            (None, None) => {
                return Err(QueryError::config(
                    "Either [service].endpoint or [service].region must be set",
                ))
            }
        };

        let mut config = AthenaConfig::new(endpoint)
            .with_timeout(self.service.timeout_secs)
            .with_page_size(self.query.page_size);
        if let Some(token) = &self.service.auth_token {
            config = config.with_auth_token(token.clone());
        }
        Ok(config)
    }
}
