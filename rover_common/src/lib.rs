//! Rover Common Library
//!
//! This crate provides shared constants, configuration loading utilities and
//! the hardware abstraction types used by every rover firmware crate.
//!
//! # Module Structure
//!
//! - [`consts`] - System-wide numeric limits and protocol letters
//! - [`config`] - Configuration loading traits and types
//! - [`control_unit`] - Firmware configuration (axes, servos, odometry, homing)
//! - [`hal`] - HAL driver trait, HAL configuration and cycle data types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use rover_common::prelude::*;
//! use rover_common::config::{ConfigLoader, SharedConfig};
//! ```

pub mod config;
pub mod consts;
pub mod control_unit;
pub mod hal;
pub mod prelude;
