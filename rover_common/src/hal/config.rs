//! HAL driver configuration (`[hal]` section).

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

fn default_driver() -> String {
    "simulation".to_string()
}

/// Driver selection plus driver-specific parameters.
///
/// # TOML Example
///
/// ```toml
/// [hal]
/// driver = "simulation"
///
/// [hal.simulation]
/// wheel_ticks_per_pwm_second = 8.0
///
/// [[hal.simulation.axes]]
/// switch_position = -400
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HalConfig {
    /// Registered driver name.
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Parameters of the `simulation` driver.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl HalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.driver.is_empty() {
            return Err(ConfigError::ValidationError(
                "hal.driver cannot be empty".to_string(),
            ));
        }
        self.simulation.validate()
    }
}

fn default_ticks_per_pwm_second() -> f64 {
    8.0
}

/// Simulated plant parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Encoder ticks per second produced by one PWM unit of net drive.
    #[serde(default = "default_ticks_per_pwm_second")]
    pub wheel_ticks_per_pwm_second: f64,
    /// Per-axis plant parameters, in axis order. Missing entries use defaults.
    #[serde(default)]
    pub axes: Vec<SimAxisConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            wheel_ticks_per_pwm_second: default_ticks_per_pwm_second(),
            axes: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Plant parameters of axis `index`, falling back to the defaults.
    pub fn axis(&self, index: usize) -> SimAxisConfig {
        self.axes.get(index).copied().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.wheel_ticks_per_pwm_second.is_finite() && self.wheel_ticks_per_pwm_second >= 0.0)
        {
            return Err(ConfigError::ValidationError(
                "hal.simulation.wheel_ticks_per_pwm_second must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_switch_position() -> i64 {
    -400
}

/// Simulated stepper axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimAxisConfig {
    /// Physical step position of the limit switch, relative to power-on.
    ///
    /// The switch reads pressed at and beyond this position (away from 0).
    #[serde(default = "default_switch_position")]
    pub switch_position: i64,
}

impl Default for SimAxisConfig {
    fn default() -> Self {
        Self {
            switch_position: default_switch_position(),
        }
    }
}
