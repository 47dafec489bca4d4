//! Homing configuration types.
//!
//! Defines `HomingDirection`, the per-axis `AxisHomingConfig` and the
//! session-wide `HomingSessionConfig`.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Homing approach direction.
///
/// Determines the travel direction while seeking the limit switch. The
/// retract move always runs the opposite way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HomingDirection {
    /// Approach in +direction.
    Positive,
    /// Approach in -direction.
    #[default]
    Negative,
}

impl HomingDirection {
    /// Returns the sign multiplier for the approach direction.
    #[inline]
    pub const fn sign(&self) -> i32 {
        match self {
            Self::Positive => 1,
            Self::Negative => -1,
        }
    }
}

fn default_retract_steps() -> u32 {
    50
}

fn default_active_high() -> bool {
    true
}

/// Per-axis homing parameters (`[axes.homing]`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisHomingConfig {
    /// Constant seek speed [steps/s].
    pub speed: f64,
    /// Acceleration used for the retract move [steps/s²].
    pub acceleration: f64,
    /// Direction toward the limit switch.
    #[serde(default)]
    pub direction: HomingDirection,
    /// Distance backed off the switch once it is hit [steps].
    #[serde(default = "default_retract_steps")]
    pub retract_steps: u32,
    /// Electrical level that means "switch pressed".
    #[serde(default = "default_active_high")]
    pub switch_active_high: bool,
}

impl AxisHomingConfig {
    /// Interpret a raw switch level.
    #[inline]
    pub const fn switch_active(&self, level: bool) -> bool {
        level == self.switch_active_high
    }

    /// Signed retract target relative to the switch position.
    #[inline]
    pub const fn retract_target(&self) -> i32 {
        -self.direction.sign() * self.retract_steps as i32
    }

    pub fn validate(&self, axis: &str) -> Result<(), ConfigError> {
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "axis '{axis}': homing speed must be > 0"
            )));
        }
        if !(self.acceleration.is_finite() && self.acceleration > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "axis '{axis}': homing acceleration must be > 0"
            )));
        }
        if self.retract_steps > i32::MAX as u32 {
            return Err(ConfigError::ValidationError(format!(
                "axis '{axis}': retract_steps out of range"
            )));
        }
        Ok(())
    }
}

/// Session-wide homing parameters (`[homing]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct HomingSessionConfig {
    /// Abort the session after this long. `None` waits for the switch forever.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl HomingSessionConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
