//! Configuration schema and loading.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Main Fleetgate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Gateway settings.
    #[serde(default)]
    pub gateway: GatewaySection,

    /// Remote fleet API settings.
    #[serde(default)]
    pub remote: RemoteSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Gateway configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySection {
    /// Bind mode.
    #[serde(default)]
    pub bind: BindMode,

    /// Port number.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS.
    #[serde(default = "default_true")]
    pub cors: bool,

    /// Maximum concurrent sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Authentication token for non-loopback binds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Close streams idle longer than this many seconds (0 disables).
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Per-transport teardown budget during shutdown, in seconds.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            bind: BindMode::Loopback,
            port: default_port(),
            cors: true,
            max_sessions: default_max_sessions(),
            auth_token: None,
            idle_timeout_secs: default_idle_timeout(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

/// Remote fleet API configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteSection {
    /// Base URL of the device-management API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Bearer token for the remote API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log filter directive (tracing env-filter syntax).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Network bind mode for the gateway listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    /// Bind to 127.0.0.1 only.
    #[default]
    Loopback,
    /// Bind to all interfaces.
    Lan,
}

impl FromStr for BindMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "loopback" => Ok(Self::Loopback),
            "lan" => Ok(Self::Lan),
            other => Err(ConfigError::Validation(format!(
                "Unknown bind mode '{other}', expected 'loopback' or 'lan'"
            ))),
        }
    }
}

fn default_port() -> u16 {
    18790
}

fn default_true() -> bool {
    true
}

fn default_max_sessions() -> usize {
    100
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_shutdown_grace() -> u64 {
    5
}

fn default_log_level() -> String {
    "fleetgate=info".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load from an optional path, falling back to defaults when absent.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                let config = Self::load(p)?;
                config.validate()?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Write the configuration to a file as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.gateway.port == 0 {
            errors.push("Gateway port cannot be 0".to_string());
        }

        if self.gateway.max_sessions == 0 {
            errors.push("Gateway max_sessions cannot be 0".to_string());
        }

        if self.gateway.bind != BindMode::Loopback && self.gateway.auth_token.is_none() {
            errors.push(
                "Non-loopback bind without auth_token exposes the gateway to the network"
                    .to_string(),
            );
        }

        if let Some(url) = &self.remote.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(format!("Invalid remote base_url '{url}'"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}
