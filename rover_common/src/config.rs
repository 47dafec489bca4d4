//! TOML configuration loading.
//!
//! Any `DeserializeOwned` type can be read with [`ConfigLoader`]. Errors
//! carry the file path so a bad deployment names the file at fault.
//!
//! ```rust,no_run
//! use rover_common::config::{ConfigError, ConfigLoader};
//! use rover_common::control_unit::config::FirmwareConfig;
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = FirmwareConfig::load(Path::new("/etc/rover/firmware.toml"))?;
//!     config.validate()?;
//!     println!("{} axes", config.axes.len());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("config file {0} does not exist")]
    FileNotFound(PathBuf),

    /// The file exists but could not be read.
    #[error("cannot read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// Malformed TOML or a field of the wrong type.
    #[error("invalid configuration: {0}")]
    ParseError(String),

    /// Well-formed but semantically unusable.
    #[error("configuration rejected: {0}")]
    ValidationError(String),
}

/// Log verbosity, lowercase in TOML (`log_level = "debug"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    /// Per-command and per-move detail.
    Debug,
    #[default]
    Info,
    /// Rejected commands, overruns, full reply queues.
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

fn default_service_name() -> String {
    "rover-fw".to_string()
}

/// `[shared]`: process-level settings.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "rover-fw-01"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SharedConfig {
    #[serde(default)]
    pub log_level: LogLevel,

    /// Name logged at startup; tells robots apart in collected logs.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "shared.service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// TOML loading for every deserializable type.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Read and parse `path`. Parse errors are prefixed with the path.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
            _ => ConfigError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::ParseError(msg) => {
                ConfigError::ParseError(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Parse an in-memory TOML document.
    fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
