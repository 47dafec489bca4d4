//! Firmware configuration loading with validation.
//!
//! Wraps the common `FirmwareConfig` loader and adds the rules that depend
//! on control-loop behaviour: homing may not outrun the axis and the step
//! rate is bounded by the tick (one step needs two ticks).

use rover_common::config::{ConfigError, ConfigLoader};
use rover_common::consts::DEFAULT_CONFIG_PATH;
use rover_common::control_unit::config::FirmwareConfig;
use std::path::Path;
use tracing::{info, warn};

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<FirmwareConfig, ConfigError> {
    let config = FirmwareConfig::load(path)?;
    validate(&config)?;
    info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Load config from a TOML string (for testing).
pub fn load_config_from_str(content: &str) -> Result<FirmwareConfig, ConfigError> {
    let config = FirmwareConfig::parse(content)?;
    validate(&config)?;
    Ok(config)
}

/// The file at `path`, else [`DEFAULT_CONFIG_PATH`] when it exists, else the
/// built-in rover configuration.
pub fn resolve_config(path: Option<&Path>) -> Result<FirmwareConfig, ConfigError> {
    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    match path {
        Some(path) => load_config(path),
        None if default_path.exists() => load_config(default_path),
        None => {
            info!("no config file given, using built-in configuration");
            let config = FirmwareConfig::default();
            validate(&config)?;
            Ok(config)
        }
    }
}

// ─── Validation ─────────────────────────────────────────────────────

pub fn validate(config: &FirmwareConfig) -> Result<(), ConfigError> {
    config.validate()?;
    validate_homing_speeds(config)?;
    check_step_rate(config);
    Ok(())
}

fn validate_homing_speeds(config: &FirmwareConfig) -> Result<(), ConfigError> {
    for axis in &config.axes {
        if let Some(homing) = &axis.homing {
            if homing.speed > axis.max_speed {
                return Err(ConfigError::ValidationError(format!(
                    "axis '{}': homing speed {} exceeds max_speed {}",
                    axis.name, homing.speed, axis.max_speed
                )));
            }
        }
    }
    Ok(())
}

/// Highest step rate the loop can produce [steps/s].
pub fn max_step_rate(cycle_time_us: u32) -> f64 {
    1e6 / (2.0 * f64::from(cycle_time_us))
}

fn check_step_rate(config: &FirmwareConfig) {
    let limit = max_step_rate(config.cycle.cycle_time_us);
    for axis in &config.axes {
        if axis.max_speed > limit {
            warn!(
                axis = %axis.name,
                max_speed = axis.max_speed,
                limit,
                "max_speed above what the control tick can step"
            );
        }
    }
}
