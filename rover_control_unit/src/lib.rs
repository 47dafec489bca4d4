//! # Rover Control Unit Library
//!
//! Firmware core for a small wheeled robot with stepper and servo
//! actuators. Tracks the planar pose from wheel encoder pulses and drives
//! stepper axes to targets under command from a host over a line protocol.
//!
//! ## Per-Tick Flow
//!
//! 1. **Commands**: received lines are parsed and applied (`command`)
//! 2. **Homing**: the active session advances on limit switch levels
//! 3. **Motion**: every axis is polled; completed moves report `ok`
//! 4. **Odometry**: encoder deltas are integrated once per period
//! 5. **Outputs**: stepper lines, servos and drive PWM go to the HAL
//!
//! Encoder edges arrive outside the loop and only touch atomic counters.

pub mod actuator;
pub mod command;
pub mod config;
pub mod cycle;
pub mod link;
pub mod motion;
pub mod odometry;
pub mod report;
pub mod safety;
pub mod unit;
