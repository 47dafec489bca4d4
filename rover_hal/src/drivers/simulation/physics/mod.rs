//! Physics simulation module.
//!
//! Step counting for stepper axes and wheel travel for the drive encoders.

mod stepper;
mod wheels;

pub use stepper::StepperSimulator;
pub use wheels::WheelSimulator;
