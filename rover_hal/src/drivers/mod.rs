//! HAL driver implementations.
//!
//! - [`simulation`] - Software simulation driver for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `HalDriver` trait from `rover_common::hal::driver`
//! 3. Register the driver in [`register_all_drivers`]

pub mod simulation;

use crate::driver_registry::DriverRegistry;
use tracing::warn;

/// Register all built-in drivers into `registry`.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    if let Err(e) = registry.register(
        "simulation",
        "host-side plant: steppers with limit switches, servos, drive wheels",
        simulation::create_driver,
    ) {
        warn!("{e}");
    }
}
