use crate::error::ConfigError;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Socket the executor server listens on unless configured otherwise
pub const DEFAULT_EXECUTOR_ENDPOINT: &str = "/var/run/executor.sock";

/// Socket the observer server listens on unless configured otherwise
pub const DEFAULT_OBSERVER_ENDPOINT: &str = "/var/run/observer.sock";

/// Settings shared by both plugin servers
///
/// Every section is optional; missing values take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub kubernetes: KubernetesConfig,
    pub prometheus: PrometheusConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Unix socket path; each server has its own default
    pub endpoint: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesConfig {
    /// Kubeconfig file; the in-cluster or default configuration is inferred when unset
    pub kubeconfig: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrometheusConfig {
    /// Server address, e.g. `http://prometheus:9090`
    pub address: Option<String>,
    /// Range query resolution
    pub step_seconds: u64,
    /// HTTP request timeout
    pub timeout_seconds: u64,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            address: None,
            step_seconds: 60,
            timeout_seconds: 30,
        }
    }
}

impl PrometheusConfig {
    pub fn step(&self) -> Duration {
        Duration::from_secs(self.step_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    /// Read and validate a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(endpoint) = &self.server.endpoint {
            if endpoint.as_os_str().is_empty() {
                return Err(ConfigError::ValidationError(
                    "server.endpoint must not be empty".to_string(),
                ));
            }
        }

        if self.prometheus.step_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "prometheus.step_seconds must be greater than 0".to_string(),
            ));
        }

        if self.prometheus.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "prometheus.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if let Some(address) = &self.prometheus.address {
            if !(address.starts_with("http://") || address.starts_with("https://")) {
                return Err(ConfigError::ValidationError(format!(
                    "prometheus.address must start with http:// or https://, got '{}'",
                    address
                )));
            }
        }

        Ok(())
    }

    /// Load configuration from file or use defaults
    ///
    /// A missing or unreadable file and an invalid file both fall back to the
    /// defaults; the problem is logged.
    pub fn load(path: Option<&Path>) -> Config {
        let Some(path) = path else {
            info!("Using default configuration");
            return Config::default();
        };

        info!("Loading configuration from: {}", path.display());
        match Config::from_file(path) {
            Ok(config) => config,
            Err(ConfigError::ReadError(_)) => {
                warn!(
                    "Configuration file '{}' not found or unreadable, using defaults",
                    path.display()
                );
                Config::default()
            }
            Err(e) => {
                error!("Configuration error in '{}': {}", path.display(), e);
                warn!("Using default configuration due to invalid config file");
                Config::default()
            }
        }
    }

    /// Configured socket path, or `default` when none is set
    pub fn endpoint_or(&self, default: &str) -> PathBuf {
        self.server
            .endpoint
            .clone()
            .unwrap_or_else(|| PathBuf::from(default))
    }
}
