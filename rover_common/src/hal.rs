//! Hardware abstraction layer interface.
//!
//! This module contains the driver trait, the driver configuration and the
//! per-cycle command/status types exchanged between the control unit and a
//! HAL driver.

pub mod config;
pub mod driver;
pub mod types;
