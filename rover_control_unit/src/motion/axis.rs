//! Non-blocking step/dir axis driver.
//!
//! Trapezoidal speed profile after D. Austin, "Generate stepper-motor speed
//! profiles in real time" (the AccelStepper formulation):
//!
//! ```text
//! c0 = 0.676·√(2/a)·1e6 µs       first step interval
//! cn = cn-1 − 2·cn-1 / (4n + 1)  accelerating (n > 0) or decelerating (n < 0)
//! cmin = 1e6 / max_speed         interval floor
//! ```
//!
//! Deceleration starts once `v² / 2a` reaches the remaining distance.
//! `poll()` is timing-gated and never sleeps: a step raises the step line
//! and stores a pulse-low deadline that a later poll honours.

use rover_common::control_unit::config::AxisConfig;
use rover_common::hal::types::StepperLines;
use std::time::Duration;

/// Index of an axis in configuration order.
pub type AxisId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Negative,
    Positive,
}

/// How the step interval is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedMode {
    /// Accelerate toward the target and decelerate onto it.
    Profiled,
    /// Run at the `set_speed` rate, ignoring the target.
    Constant,
}

/// Outcome of one `poll()` / `step()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisPoll {
    /// Nothing left to do.
    Idle,
    /// Moving, no step this time.
    Running,
    /// One step was emitted.
    Stepped,
}

#[derive(Debug, Clone)]
pub struct AxisDriver {
    current_position: i32,
    target_position: i32,
    max_speed: f64,
    acceleration: f64,
    enabled: bool,
    mode: SpeedMode,
    direction: Direction,
    /// Signed speed [steps/s].
    speed: f64,
    /// Current step interval [µs]; 0 means stopped.
    step_interval_us: f64,
    /// Step counter of the ramp; negative while decelerating.
    n: i64,
    c0: f64,
    cn: f64,
    cmin: f64,
    last_step_at: Option<Duration>,
    pulse_low_at: Option<Duration>,
    /// Direction of the pulse in flight; held until the line drops.
    pulse_direction: Direction,
    pulse_width: Duration,
}

impl AxisDriver {
    /// Enabled axis at position 0.
    ///
    /// `max_speed` and `acceleration` must be positive; configuration
    /// validation guarantees it.
    pub fn new(max_speed: f64, acceleration: f64, pulse_width: Duration) -> Self {
        let max_speed = max_speed.abs();
        let acceleration = acceleration.abs();
        Self {
            current_position: 0,
            target_position: 0,
            max_speed,
            acceleration,
            enabled: true,
            mode: SpeedMode::Profiled,
            direction: Direction::Positive,
            speed: 0.0,
            step_interval_us: 0.0,
            n: 0,
            c0: first_interval_us(acceleration),
            cn: 0.0,
            cmin: 1e6 / max_speed,
            last_step_at: None,
            pulse_low_at: None,
            pulse_direction: Direction::Positive,
            pulse_width,
        }
    }

    pub fn from_config(config: &AxisConfig, pulse_width: Duration) -> Self {
        Self::new(config.max_speed, config.acceleration, pulse_width)
    }

    // ─── Commands ───────────────────────────────────────────────────

    /// Set an absolute target. Returns `false` (and does nothing) when the
    /// axis is disabled.
    pub fn set_target(&mut self, position: i32) -> bool {
        if !self.enabled {
            return false;
        }
        if self.mode == SpeedMode::Constant {
            self.mode = SpeedMode::Profiled;
            self.stop_profile();
        }
        if self.target_position != position {
            self.target_position = position;
            self.compute_new_speed();
        }
        true
    }

    /// Set a target relative to the current position.
    pub fn move_by(&mut self, steps: i32) -> bool {
        self.set_target(self.current_position.saturating_add(steps))
    }

    /// Run at a constant signed speed, clamped to `max_speed`.
    pub fn set_speed(&mut self, speed: f64) -> bool {
        if !self.enabled {
            return false;
        }
        let speed = speed.clamp(-self.max_speed, self.max_speed);
        self.mode = SpeedMode::Constant;
        self.n = 0;
        if speed == 0.0 {
            self.step_interval_us = 0.0;
        } else {
            self.step_interval_us = (1e6 / speed).abs();
            self.direction = if speed > 0.0 {
                Direction::Positive
            } else {
                Direction::Negative
            };
        }
        self.speed = speed;
        true
    }

    pub fn set_max_speed(&mut self, speed: f64) {
        let speed = speed.abs();
        if speed == 0.0 || !speed.is_finite() || speed == self.max_speed {
            return;
        }
        self.max_speed = speed;
        self.cmin = 1e6 / speed;
        if self.n > 0 {
            // Recompute the ramp position for the new ceiling.
            self.n = (self.speed * self.speed / (2.0 * self.acceleration)) as i64;
            self.compute_new_speed();
        }
    }

    pub fn set_acceleration(&mut self, acceleration: f64) {
        let acceleration = acceleration.abs();
        if acceleration == 0.0 || !acceleration.is_finite() || acceleration == self.acceleration {
            return;
        }
        self.n = (self.n as f64 * (self.acceleration / acceleration)) as i64;
        self.c0 = first_interval_us(acceleration);
        self.acceleration = acceleration;
        if self.mode == SpeedMode::Profiled {
            self.compute_new_speed();
        }
    }

    /// Overwrite position and target; the axis stops dead.
    pub fn set_current_position(&mut self, position: i32) {
        self.current_position = position;
        self.target_position = position;
        self.mode = SpeedMode::Profiled;
        self.stop_profile();
    }

    /// Stop immediately at the current position.
    pub fn halt(&mut self) {
        self.target_position = self.current_position;
        self.mode = SpeedMode::Profiled;
        self.stop_profile();
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Halt, drop the enable line and refuse targets until re-enabled.
    pub fn disable(&mut self) {
        self.halt();
        self.pulse_low_at = None;
        self.enabled = false;
    }

    // ─── Stepping ───────────────────────────────────────────────────

    /// Timing-gated tick.
    pub fn poll(&mut self, now: Duration) -> AxisPoll {
        if !self.enabled {
            return AxisPoll::Idle;
        }
        if let Some(deadline) = self.pulse_low_at {
            // The line must be seen low once before the next rising edge.
            if now >= deadline {
                self.pulse_low_at = None;
            }
            return AxisPoll::Running;
        }

        let stepped = self.run_speed(now);
        match self.mode {
            SpeedMode::Profiled => {
                if stepped {
                    self.compute_new_speed();
                    AxisPoll::Stepped
                } else if self.is_running() {
                    AxisPoll::Running
                } else {
                    AxisPoll::Idle
                }
            }
            SpeedMode::Constant => {
                if stepped {
                    AxisPoll::Stepped
                } else if self.speed != 0.0 {
                    AxisPoll::Running
                } else {
                    AxisPoll::Idle
                }
            }
        }
    }

    /// Ungated single step toward the target. Never overshoots.
    ///
    /// Reaching the target zeroes the profile speed.
    pub fn step(&mut self) -> AxisPoll {
        if !self.enabled {
            return AxisPoll::Idle;
        }
        let result = match self.target_position.cmp(&self.current_position) {
            std::cmp::Ordering::Greater => {
                self.direction = Direction::Positive;
                self.current_position += 1;
                AxisPoll::Stepped
            }
            std::cmp::Ordering::Less => {
                self.direction = Direction::Negative;
                self.current_position -= 1;
                AxisPoll::Stepped
            }
            std::cmp::Ordering::Equal => AxisPoll::Idle,
        };
        if self.mode == SpeedMode::Profiled && self.distance_to_go() == 0 {
            self.stop_profile();
        }
        result
    }

    fn run_speed(&mut self, now: Duration) -> bool {
        if self.step_interval_us <= 0.0 {
            return false;
        }
        let due = match self.last_step_at {
            None => true,
            Some(last) => now.saturating_sub(last).as_nanos() as f64 / 1e3 >= self.step_interval_us,
        };
        if !due {
            return false;
        }
        self.current_position = match self.direction {
            Direction::Positive => self.current_position.saturating_add(1),
            Direction::Negative => self.current_position.saturating_sub(1),
        };
        self.last_step_at = Some(now);
        self.pulse_low_at = Some(now + self.pulse_width);
        self.pulse_direction = self.direction;
        true
    }

    fn compute_new_speed(&mut self) {
        let distance_to = self.distance_to_go();
        let steps_to_stop = (self.speed * self.speed / (2.0 * self.acceleration)) as i64;

        if distance_to == 0 && steps_to_stop <= 1 {
            self.stop_profile();
            return;
        }

        if distance_to > 0 {
            if self.n > 0 {
                if steps_to_stop >= distance_to || self.direction == Direction::Negative {
                    self.n = -steps_to_stop;
                }
            } else if self.n < 0 && steps_to_stop < distance_to && self.direction == Direction::Positive {
                self.n = -self.n;
            }
        } else if distance_to < 0 {
            if self.n > 0 {
                if steps_to_stop >= -distance_to || self.direction == Direction::Positive {
                    self.n = -steps_to_stop;
                }
            } else if self.n < 0 && steps_to_stop < -distance_to && self.direction == Direction::Negative {
                self.n = -self.n;
            }
        }

        if self.n == 0 {
            self.cn = self.c0;
            self.direction = if distance_to > 0 {
                Direction::Positive
            } else {
                Direction::Negative
            };
        } else {
            self.cn -= (2.0 * self.cn) / ((4 * self.n + 1) as f64);
            self.cn = self.cn.max(self.cmin);
        }
        self.n += 1;
        self.step_interval_us = self.cn;
        self.speed = 1e6 / self.cn;
        if self.direction == Direction::Negative {
            self.speed = -self.speed;
        }
    }

    fn stop_profile(&mut self) {
        self.n = 0;
        self.speed = 0.0;
        self.step_interval_us = 0.0;
    }

    // ─── Outputs & Queries ──────────────────────────────────────────

    /// Levels for the enable/direction/step lines.
    pub fn lines(&self) -> StepperLines {
        if !self.enabled {
            return StepperLines::empty();
        }
        let mut lines = StepperLines::ENABLE;
        let direction = if self.pulse_low_at.is_some() {
            lines |= StepperLines::STEP;
            self.pulse_direction
        } else {
            self.direction
        };
        if direction == Direction::Positive {
            lines |= StepperLines::DIRECTION;
        }
        lines
    }

    #[inline]
    pub fn current_position(&self) -> i32 {
        self.current_position
    }

    #[inline]
    pub fn target_position(&self) -> i32 {
        self.target_position
    }

    #[inline]
    pub fn distance_to_go(&self) -> i64 {
        i64::from(self.target_position) - i64::from(self.current_position)
    }

    /// Signed speed [steps/s].
    #[inline]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    #[inline]
    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    #[inline]
    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn mode(&self) -> SpeedMode {
        self.mode
    }

    /// Still moving or not yet at target.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.speed != 0.0 || self.distance_to_go() != 0
    }

    /// At target, zero speed and step line low.
    #[inline]
    pub fn is_settled(&self) -> bool {
        !self.is_running() && self.pulse_low_at.is_none()
    }
}

fn first_interval_us(acceleration: f64) -> f64 {
    0.676 * (2.0 / acceleration).sqrt() * 1e6
}
