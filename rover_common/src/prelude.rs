//! Prelude module for common re-exports.
//!
//! ```rust
//! use rover_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::control_unit::config::{
    AxisConfig, CycleConfig, FirmwareConfig, OdometryConfig, ServoConfig,
};
pub use crate::control_unit::homing::{AxisHomingConfig, HomingDirection, HomingSessionConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CYCLE_TIME_US, MAX_AXES, MAX_SERVOS};

// ─── HAL ────────────────────────────────────────────────────────────
pub use crate::hal::config::HalConfig;
pub use crate::hal::driver::{EdgeSink, EncoderSide, HalDriver, HalError};
pub use crate::hal::types::{DrivePwm, HalCommands, HalStatus, ServoCommand, StepperLines};
