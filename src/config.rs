//! Simulator configuration
//!
//! Loaded from a TOML file; every section is optional and falls back to
//! its defaults. Positional CLI arguments are applied on top in `main`.
//!
//! ```toml
//! [central_system]
//! host = "127.0.0.1"
//! port = 9000
//! path = "/ocpp/"
//!
//! [charge_point]
//! id = "CP_1"
//! vendor = "Wall Box Chargers"
//!
//! [session]
//! call_timeout_secs = 30
//! connector_id = 1
//!
//! [logging]
//! level = "info"
//! format = "plain"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::SessionSettings;
use crate::domain::ChargePointIdentity;

/// Environment variable pointing at the config file.
pub const CONFIG_ENV: &str = "OCPP_CP_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub central_system: CentralSystemConfig,
    pub charge_point: ChargePointIdentity,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralSystemConfig {
    pub host: String,
    pub port: u16,
    /// Prefix the charge point id is appended to.
    pub path: String,
}

impl Default for CentralSystemConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            path: "/".to_string(),
        }
    }
}

impl CentralSystemConfig {
    pub fn url_for(&self, charge_point_id: &str) -> String {
        format!(
            "ws://{}:{}{}{}",
            self.host, self.port, self.path, charge_point_id
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub call_timeout_secs: u64,
    pub connector_id: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 30,
            connector_id: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error
    pub level: String,
    /// plain or json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "plain".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.central_system.host.is_empty() {
            return Err(ConfigError::Invalid("central_system.host is empty".into()));
        }
        if self.central_system.port == 0 {
            return Err(ConfigError::Invalid("central_system.port must be > 0".into()));
        }
        if !self.central_system.path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "central_system.path must start with '/': {:?}",
                self.central_system.path
            )));
        }
        if self.charge_point.id.is_empty() {
            return Err(ConfigError::Invalid("charge_point.id is empty".into()));
        }
        if self.session.connector_id == 0 {
            return Err(ConfigError::Invalid("session.connector_id must be > 0".into()));
        }
        if self.session.call_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "session.call_timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn url(&self) -> String {
        self.central_system.url_for(&self.charge_point.id)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            identity: self.charge_point.clone(),
            connector_id: self.session.connector_id,
            call_timeout: Duration::from_secs(self.session.call_timeout_secs),
        }
    }
}

/// `$OCPP_CP_CONFIG`, else `~/.config/texnouz-cp-sim/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs_next::config_dir()
        .map(|dir| dir.join("texnouz-cp-sim"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}
