//! System-wide constants for the rover firmware workspace.
//!
//! Single source of truth for all numeric limits and default paths.

use static_assertions::const_assert;

/// Maximum number of stepper axes.
pub const MAX_AXES: usize = 4;

/// Maximum number of servo actuators.
pub const MAX_SERVOS: usize = 8;

/// Number of drive PWM channels (left fwd/rev, right fwd/rev).
pub const DRIVE_CHANNELS: usize = 4;

/// Default control tick in microseconds.
pub const CYCLE_TIME_US: u32 = 200;

/// Shortest accepted control tick in microseconds.
pub const CYCLE_TIME_US_MIN: u32 = 50;

/// Longest accepted control tick in microseconds.
pub const CYCLE_TIME_US_MAX: u32 = 10_000;

/// Default odometry update period in microseconds (8 ms).
pub const ODOMETRY_PERIOD_US: u32 = 8_000;

/// Default step pulse high time in microseconds.
pub const STEP_PULSE_WIDTH_US: u32 = 20;

/// Largest servo angle in degrees.
pub const SERVO_ANGLE_MAX: u16 = 180;

/// Longest accepted serial command line (bytes, without newline).
pub const SERIAL_LINE_MAX: usize = 64;

/// Reply lines buffered per control tick.
pub const REPLY_QUEUE_DEPTH: usize = 16;

/// Host lines applied per cycle; the rest wait in the link for the next one.
///
/// Each line yields at most one reply, and the tick after them may add one
/// completion per axis, the homing result and a pose report.
pub const COMMANDS_PER_CYCLE: usize = REPLY_QUEUE_DEPTH - MAX_AXES - 2;

/// Command letters with a fixed meaning; never assignable to axes or servos.
pub const RESERVED_LETTERS: &[char] = &['d', 'e', 'g', 'h', 'n', 'p', 'r', 's'];

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/rover/firmware.toml";

const_assert!(REPLY_QUEUE_DEPTH > MAX_AXES + 2);
const_assert!(COMMANDS_PER_CYCLE + MAX_AXES + 2 <= REPLY_QUEUE_DEPTH);
const_assert!(CYCLE_TIME_US_MIN <= CYCLE_TIME_US && CYCLE_TIME_US <= CYCLE_TIME_US_MAX);
const_assert!(MAX_AXES + MAX_SERVOS + RESERVED_LETTERS.len() <= 26);
