//! Dead-reckoning odometry.
//!
//! Encoder edges land in [`encoder::PulseCounter`]s from interrupt context;
//! the [`estimator::Odometry`] samples them once per odometry period and
//! integrates the robot pose.

pub mod encoder;
pub mod estimator;
