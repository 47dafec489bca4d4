//! HAL command and status types.
//!
//! - `HalCommands` - output levels from the control unit to the HAL
//! - `HalStatus` - input levels from the HAL to the control unit
//! - `StepperLines` - enable/direction/step lines of one stepper driver
//! - `ServoCommand` / `DrivePwm` - actuator outputs

use crate::consts::{DRIVE_CHANNELS, MAX_AXES, MAX_SERVOS};
use bitflags::bitflags;

bitflags! {
    /// Output lines of one step/dir stepper driver.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StepperLines: u8 {
        /// Driver enable (motor energized).
        const ENABLE    = 0x01;
        /// Direction line; set means positive steps.
        const DIRECTION = 0x02;
        /// Step line; one step per rising edge.
        const STEP      = 0x04;
    }
}

/// One servo output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServoCommand {
    /// PWM signal present. A detached servo holds no torque.
    pub attached: bool,
    /// Commanded angle in degrees (0-180).
    pub angle: u16,
}

/// Drive motor PWM duty (0-255 per channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrivePwm {
    pub left_forward: u8,
    pub left_reverse: u8,
    pub right_forward: u8,
    pub right_reverse: u8,
}

impl DrivePwm {
    pub const STOPPED: Self = Self {
        left_forward: 0,
        left_reverse: 0,
        right_forward: 0,
        right_reverse: 0,
    };

    pub const fn from_channels(ch: [u8; DRIVE_CHANNELS]) -> Self {
        Self {
            left_forward: ch[0],
            left_reverse: ch[1],
            right_forward: ch[2],
            right_reverse: ch[3],
        }
    }

    /// Net signed duty of the left wheel (forward positive).
    #[inline]
    pub const fn left_net(&self) -> i16 {
        self.left_forward as i16 - self.left_reverse as i16
    }

    /// Net signed duty of the right wheel (forward positive).
    #[inline]
    pub const fn right_net(&self) -> i16 {
        self.right_forward as i16 - self.right_reverse as i16
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        *self == Self::STOPPED
    }
}

/// Outputs applied by the driver in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HalCommands {
    /// Per-axis stepper lines (unused slots stay empty).
    pub steppers: [StepperLines; MAX_AXES],
    /// Per-servo outputs (unused slots stay detached).
    pub servos: [ServoCommand; MAX_SERVOS],
    /// Drive motor PWM.
    pub drive: DrivePwm,
}

/// Inputs sampled by the driver in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HalStatus {
    /// Raw limit switch levels, one per axis.
    pub limit_switches: [bool; MAX_AXES],
}
