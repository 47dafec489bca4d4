//! Firmware configuration shared by the control unit and its tooling.
//!
//! Organized by domain: the top-level `FirmwareConfig` with its cycle,
//! odometry, axis and servo sections, and the homing parameters.

pub mod config;
pub mod homing;
