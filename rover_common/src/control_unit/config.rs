//! Configuration structures for the firmware.
//!
//! All config types use `serde::Deserialize` for TOML loading.
//! Optional fields use `#[serde(default)]` so a minimal file only names
//! what differs from the built-in robot.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    CYCLE_TIME_US, CYCLE_TIME_US_MAX, CYCLE_TIME_US_MIN, MAX_AXES, MAX_SERVOS,
    ODOMETRY_PERIOD_US, RESERVED_LETTERS, SERVO_ANGLE_MAX, STEP_PULSE_WIDTH_US,
};
use crate::hal::config::HalConfig;

use super::homing::{AxisHomingConfig, HomingDirection, HomingSessionConfig};

// ─── Top-Level Config ───────────────────────────────────────────────

/// Top-level firmware configuration.
///
/// Loaded from TOML at startup and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FirmwareConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub odometry: OdometryConfig,
    #[serde(default)]
    pub axes: Vec<AxisConfig>,
    #[serde(default)]
    pub homing: HomingSessionConfig,
    #[serde(default)]
    pub servos: Vec<ServoConfig>,
    #[serde(default)]
    pub hal: HalConfig,
}

impl Default for FirmwareConfig {
    /// The two-stepper, seven-servo rover.
    fn default() -> Self {
        let lift_homing = AxisHomingConfig {
            speed: 400.0,
            acceleration: 2000.0,
            direction: HomingDirection::Negative,
            retract_steps: 50,
            switch_active_high: true,
        };
        let servo = |name: &str, letter: char| ServoConfig {
            name: name.to_string(),
            letter,
            home_angle: 0,
        };
        Self {
            shared: SharedConfig::default(),
            cycle: CycleConfig::default(),
            odometry: OdometryConfig::default(),
            axes: vec![
                AxisConfig {
                    name: "right".to_string(),
                    letter: 'a',
                    max_speed: 2000.0,
                    acceleration: 4000.0,
                    homing: Some(lift_homing),
                },
                AxisConfig {
                    name: "mid".to_string(),
                    letter: 'b',
                    max_speed: 2000.0,
                    acceleration: 4000.0,
                    homing: Some(lift_homing),
                },
            ],
            homing: HomingSessionConfig {
                timeout_ms: Some(20_000),
            },
            servos: vec![
                servo("lift_left", 'k'),
                servo("plate_grip", 'l'),
                servo("flag", 't'),
                servo("grip_right", 'v'),
                servo("rotate_right", 'w'),
                servo("rotate_left", 'x'),
                servo("grip_left", 'y'),
            ],
            hal: HalConfig::default(),
        }
    }
}

impl FirmwareConfig {
    /// Validate bounds of every section.
    ///
    /// Cross-section rules (letter collisions, duplicate names) are checked
    /// here too, so a config that passes can be bound to the protocol as is.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.cycle.validate()?;
        self.odometry.validate()?;
        self.hal.validate()?;

        if self.axes.len() > MAX_AXES {
            return Err(ConfigError::ValidationError(format!(
                "{} axes configured, at most {MAX_AXES} supported",
                self.axes.len()
            )));
        }
        if self.servos.len() > MAX_SERVOS {
            return Err(ConfigError::ValidationError(format!(
                "{} servos configured, at most {MAX_SERVOS} supported",
                self.servos.len()
            )));
        }
        for axis in &self.axes {
            axis.validate()?;
        }
        for servo in &self.servos {
            servo.validate()?;
        }

        let mut letters: Vec<(char, &str)> = Vec::with_capacity(self.axes.len() + self.servos.len());
        let names = self
            .axes
            .iter()
            .map(|a| (a.letter, a.name.as_str()))
            .chain(self.servos.iter().map(|s| (s.letter, s.name.as_str())));
        for (letter, name) in names {
            if !letter.is_ascii_lowercase() {
                return Err(ConfigError::ValidationError(format!(
                    "'{name}': letter '{letter}' must be a lowercase ASCII letter"
                )));
            }
            if RESERVED_LETTERS.contains(&letter) {
                return Err(ConfigError::ValidationError(format!(
                    "'{name}': letter '{letter}' is reserved by the protocol"
                )));
            }
            if let Some((_, other)) = letters.iter().find(|(l, _)| *l == letter) {
                return Err(ConfigError::ValidationError(format!(
                    "'{name}': letter '{letter}' already used by '{other}'"
                )));
            }
            if letters.iter().any(|(_, n)| *n == name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate name '{name}'"
                )));
            }
            letters.push((letter, name));
        }
        Ok(())
    }

    /// Index of the axis bound to `letter`.
    pub fn axis_by_letter(&self, letter: char) -> Option<usize> {
        self.axes.iter().position(|a| a.letter == letter)
    }

    /// Index of the servo bound to `letter`.
    pub fn servo_by_letter(&self, letter: char) -> Option<usize> {
        self.servos.iter().position(|s| s.letter == letter)
    }
}

// ─── Cycle ──────────────────────────────────────────────────────────

fn default_cycle_time_us() -> u32 {
    CYCLE_TIME_US
}
fn default_odometry_period_us() -> u32 {
    ODOMETRY_PERIOD_US
}
fn default_step_pulse_width_us() -> u32 {
    STEP_PULSE_WIDTH_US
}

/// Control loop timing (`[cycle]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CycleConfig {
    /// Control tick [µs].
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,
    /// Odometry update period [µs].
    #[serde(default = "default_odometry_period_us")]
    pub odometry_period_us: u32,
    /// Unsolicited pose report period [ms]; 0 reports only on `p`.
    #[serde(default)]
    pub report_interval_ms: u32,
    /// Step line high time [µs].
    #[serde(default = "default_step_pulse_width_us")]
    pub step_pulse_width_us: u32,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cycle_time_us: CYCLE_TIME_US,
            odometry_period_us: ODOMETRY_PERIOD_US,
            report_interval_ms: 0,
            step_pulse_width_us: STEP_PULSE_WIDTH_US,
        }
    }
}

impl CycleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(CYCLE_TIME_US_MIN..=CYCLE_TIME_US_MAX).contains(&self.cycle_time_us) {
            return Err(ConfigError::ValidationError(format!(
                "cycle_time_us {} out of range [{CYCLE_TIME_US_MIN}, {CYCLE_TIME_US_MAX}]",
                self.cycle_time_us
            )));
        }
        if self.odometry_period_us < self.cycle_time_us {
            return Err(ConfigError::ValidationError(format!(
                "odometry_period_us {} shorter than cycle_time_us {}",
                self.odometry_period_us, self.cycle_time_us
            )));
        }
        if self.step_pulse_width_us == 0 || self.step_pulse_width_us >= self.cycle_time_us {
            return Err(ConfigError::ValidationError(format!(
                "step_pulse_width_us {} must be in (0, cycle_time_us)",
                self.step_pulse_width_us
            )));
        }
        Ok(())
    }
}

// ─── Odometry ───────────────────────────────────────────────────────

fn default_pulses_per_revolution() -> f64 {
    1200.0
}
fn default_encoder_wheel_diameter_mm() -> f64 {
    50.0
}
fn default_encoder_wheelbase_mm() -> f64 {
    127.0
}
fn default_initial_xy_mm() -> f64 {
    255.0
}

/// Encoder geometry and start pose (`[odometry]`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OdometryConfig {
    #[serde(default = "default_pulses_per_revolution")]
    pub pulses_per_revolution: f64,
    #[serde(default = "default_encoder_wheel_diameter_mm")]
    pub encoder_wheel_diameter_mm: f64,
    /// Distance between the two encoder wheels [mm].
    #[serde(default = "default_encoder_wheelbase_mm")]
    pub encoder_wheelbase_mm: f64,
    #[serde(default = "default_initial_xy_mm")]
    pub initial_x_mm: f64,
    #[serde(default = "default_initial_xy_mm")]
    pub initial_y_mm: f64,
    #[serde(default)]
    pub initial_theta_deg: f64,
}

impl Default for OdometryConfig {
    fn default() -> Self {
        Self {
            pulses_per_revolution: default_pulses_per_revolution(),
            encoder_wheel_diameter_mm: default_encoder_wheel_diameter_mm(),
            encoder_wheelbase_mm: default_encoder_wheelbase_mm(),
            initial_x_mm: default_initial_xy_mm(),
            initial_y_mm: default_initial_xy_mm(),
            initial_theta_deg: 0.0,
        }
    }
}

impl OdometryConfig {
    /// Encoder pulses per millimetre of wheel travel.
    #[inline]
    pub fn pulses_per_mm(&self) -> f64 {
        self.pulses_per_revolution / (std::f64::consts::PI * self.encoder_wheel_diameter_mm)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("pulses_per_revolution", self.pulses_per_revolution),
            ("encoder_wheel_diameter_mm", self.encoder_wheel_diameter_mm),
            ("encoder_wheelbase_mm", self.encoder_wheelbase_mm),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "odometry.{field} must be > 0"
                )));
            }
        }
        let finite = [self.initial_x_mm, self.initial_y_mm, self.initial_theta_deg];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::ValidationError(
                "odometry initial pose must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Axes & Servos ──────────────────────────────────────────────────

/// One stepper axis (`[[axes]]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisConfig {
    pub name: String,
    /// Protocol letter selecting this axis.
    pub letter: char,
    /// Nominal speed limit [steps/s].
    pub max_speed: f64,
    /// Nominal acceleration [steps/s²].
    pub acceleration: f64,
    /// Present when the axis has a limit switch.
    #[serde(default)]
    pub homing: Option<AxisHomingConfig>,
}

impl AxisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "axis name cannot be empty".to_string(),
            ));
        }
        if !(self.max_speed.is_finite() && self.max_speed > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "axis '{}': max_speed must be > 0",
                self.name
            )));
        }
        if !(self.acceleration.is_finite() && self.acceleration > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "axis '{}': acceleration must be > 0",
                self.name
            )));
        }
        if let Some(homing) = &self.homing {
            homing.validate(&self.name)?;
        }
        Ok(())
    }
}

/// One servo actuator (`[[servos]]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServoConfig {
    pub name: String,
    pub letter: char,
    /// Angle commanded at startup [deg].
    #[serde(default)]
    pub home_angle: u16,
}

impl ServoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "servo name cannot be empty".to_string(),
            ));
        }
        if self.home_angle > SERVO_ANGLE_MAX {
            return Err(ConfigError::ValidationError(format!(
                "servo '{}': home_angle {} > {SERVO_ANGLE_MAX}",
                self.name, self.home_angle
            )));
        }
        Ok(())
    }
}
