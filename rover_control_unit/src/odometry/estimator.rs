//! Pose integration from wheel encoder deltas.
//!
//! Per update:
//!
//! ```text
//! d_i      = ticks_i / pulses_per_mm
//! d_center = (d_left + d_right) / 2
//! dθ       = (d_left - d_right) / wheelbase
//! x += d_center·cos(θ + dθ/2),  y += d_center·sin(θ + dθ/2),  θ += dθ
//! ```
//!
//! Heading grows when the left wheel travels further than the right.
//! θ is kept in [0, 2π).

use super::encoder::{EncoderAxis, PulseCounter};
use rover_common::control_unit::config::OdometryConfig;
use std::f64::consts::TAU;
use std::sync::Arc;
use tracing::trace;

/// Wrap `theta` into [0, 2π).
#[inline]
pub fn normalize_angle(theta: f64) -> f64 {
    let wrapped = theta.rem_euclid(TAU);
    // rem_euclid rounds tiny negative inputs up to exactly TAU
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Planar robot pose: millimetres and radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl Pose {
    /// Pose with `theta` normalised.
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self {
            x,
            y,
            theta: normalize_angle(theta),
        }
    }

    pub fn from_degrees(x: f64, y: f64, theta_deg: f64) -> Self {
        Self::new(x, y, theta_deg.to_radians())
    }

    #[inline]
    pub fn theta_degrees(&self) -> f64 {
        self.theta.to_degrees()
    }
}

/// Displacement produced by one update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseDelta {
    pub dx: f64,
    pub dy: f64,
    pub dtheta: f64,
}

/// Incremental odometry estimator.
#[derive(Debug)]
pub struct Odometry {
    pulses_per_mm: f64,
    wheelbase_mm: f64,
    left: EncoderAxis,
    right: EncoderAxis,
    pose: Pose,
    updates: u64,
}

impl Odometry {
    pub fn new(config: &OdometryConfig) -> Self {
        Self {
            pulses_per_mm: config.pulses_per_mm(),
            wheelbase_mm: config.encoder_wheelbase_mm,
            left: EncoderAxis::new(),
            right: EncoderAxis::new(),
            pose: Pose::from_degrees(
                config.initial_x_mm,
                config.initial_y_mm,
                config.initial_theta_deg,
            ),
            updates: 0,
        }
    }

    /// Counters to attach to the left and right encoder edge sources.
    pub fn edge_sinks(&self) -> (Arc<PulseCounter>, Arc<PulseCounter>) {
        (self.left.counter(), self.right.counter())
    }

    /// Sample both counters and integrate the pose.
    pub fn update(&mut self) -> PoseDelta {
        let dl = self.left.sample();
        let dr = self.right.sample();
        self.integrate(dl, dr)
    }

    /// Integrate one pair of tick deltas.
    pub fn integrate(&mut self, dl: i32, dr: i32) -> PoseDelta {
        let dist_left = f64::from(dl) / self.pulses_per_mm;
        let dist_right = f64::from(dr) / self.pulses_per_mm;
        let dist_center = (dist_left + dist_right) / 2.0;
        let dtheta = (dist_left - dist_right) / self.wheelbase_mm;

        let heading = self.pose.theta + dtheta / 2.0;
        let delta = PoseDelta {
            dx: dist_center * heading.cos(),
            dy: dist_center * heading.sin(),
            dtheta,
        };

        self.pose.x += delta.dx;
        self.pose.y += delta.dy;
        self.pose.theta = normalize_angle(self.pose.theta + dtheta);
        self.updates += 1;

        if dl != 0 || dr != 0 {
            trace!(dl, dr, x = self.pose.x, y = self.pose.y, theta = self.pose.theta, "odometry");
        }
        delta
    }

    #[inline]
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Overwrite the pose; theta is normalised.
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = Pose::new(pose.x, pose.y, pose.theta);
    }

    /// Zero both tick counters and their snapshots.
    pub fn reset_ticks(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    /// Raw (left, right) tick counts.
    pub fn tick_counts(&self) -> (i32, i32) {
        (self.left.tick_count(), self.right.tick_count())
    }

    pub fn pulses_per_mm(&self) -> f64 {
        self.pulses_per_mm
    }

    /// Number of updates integrated so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }
}
