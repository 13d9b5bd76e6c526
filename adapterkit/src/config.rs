use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::AdapterError;

pub const DEFAULT_PORT: u16 = 9042;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RETRIES: u32 = 1;
pub const DEFAULT_APPLICATION_NAME: &str = "dbt";

/// Connection credentials for a ScyllaDB profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub user: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Mandatory on Scylla.
    #[serde(alias = "pass")]
    pub password: String,
    #[serde(alias = "schema")]
    pub keyspace: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_application_name")]
    pub application_name: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_application_name() -> Option<String> {
    Some(DEFAULT_APPLICATION_NAME.to_string())
}

impl Credentials {
    /// Create credentials with default timeout, retries and application name.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        keyspace: impl Into<String>,
    ) -> Result<Self, AdapterError> {
        let credentials = Self {
            host: host.into(),
            user: user.into(),
            port,
            password: password.into(),
            keyspace: keyspace.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            retries: DEFAULT_RETRIES,
            application_name: default_application_name(),
        };
        credentials.validate()?;
        Ok(credentials)
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout = secs;
        self
    }

    pub fn with_application_name(mut self, name: Option<String>) -> Self {
        self.application_name = name;
        self
    }

    pub fn validate(&self) -> Result<(), AdapterError> {
        if self.host.trim().is_empty() {
            return Err(AdapterError::ConfigError("host must not be empty".to_string()));
        }
        if self.password.is_empty() {
            return Err(AdapterError::ConfigError(
                "password is mandatory for Scylla connections".to_string(),
            ));
        }
        Ok(())
    }

    pub fn adapter_type(&self) -> &'static str {
        "scylla"
    }

    pub fn unique_field(&self) -> &str {
        &self.host
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Field names that identify the connection in logs and debug output.
    pub fn connection_keys(&self) -> &'static [&'static str] {
        &[
            "host",
            "port",
            "user",
            "keyspace",
            "connect_timeout",
            "application_name",
            "retries",
        ]
    }

    /// `(key, value)` pairs for every connection key; the password never appears.
    pub fn connection_info(&self) -> Vec<(&'static str, String)> {
        self.connection_keys()
            .iter()
            .map(|key| {
                let value = match *key {
                    "host" => self.host.clone(),
                    "port" => self.port.to_string(),
                    "user" => self.user.clone(),
                    "keyspace" => self.keyspace.clone(),
                    "connect_timeout" => self.connect_timeout.to_string(),
                    "application_name" => self.application_name.clone().unwrap_or_default(),
                    "retries" => self.retries.to_string(),
                    _ => String::new(),
                };
                (*key, value)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Top-level profile: credentials plus observability settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub credentials: Credentials,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Load a profile from `path`, overridden by `SCYLLA_ADAPTER__*` environment variables.
pub fn load_config(path: &str) -> Result<AdapterConfig, AdapterError> {
    let config = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix("SCYLLA_ADAPTER")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let config: AdapterConfig = config.try_deserialize()?;
    config.credentials.validate()?;
    Ok(config)
}
