//! Simulation driver module.
//!
//! Software plant for running the firmware on a host: step/dir steppers
//! with limit switches, servo outputs and drive wheels that raise encoder
//! edges.

mod driver;
mod physics;

pub use driver::SimulationDriver;
pub use physics::{StepperSimulator, WheelSimulator};

use rover_common::hal::driver::HalDriver;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn HalDriver> {
    Box::new(SimulationDriver::new())
}
