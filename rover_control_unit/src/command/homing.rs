//! Limit-switch homing.
//!
//! ## Lifecycle
//!
//! 1. `HomingSession::start()` saves each axis' nominal limits and sends it
//!    toward its switch at the constant homing speed (Seeking).
//! 2. On switch contact the axis stops, is zeroed, gets its nominal max
//!    speed back and makes a profiled retract move at the homing
//!    acceleration (Retracting).
//! 3. When the retract settles, nominal limits are restored and the
//!    retracted position becomes 0 (Done).
//!
//! All axes of a session advance in the same tick. An optional timeout
//! aborts every axis not yet Done.

use crate::motion::axis::{AxisDriver, AxisId};
use heapless::Vec;
use rover_common::consts::MAX_AXES;
use rover_common::control_unit::homing::AxisHomingConfig;
use std::time::Duration;
use tracing::{debug, info, warn};

// ─── Homing Phases ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingPhase {
    /// Running toward the switch at constant speed.
    Seeking,
    /// Backing off the switch.
    Retracting,
    /// Zeroed; accepts moves again.
    Done,
    /// Aborted; limits restored, position unknown.
    Failed,
}

// ─── Homing Result ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingTickResult {
    InProgress,
    /// Every axis of the session is Done.
    Complete,
    Failed { reason: HomingFailReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingFailReason {
    /// Session timeout exceeded.
    Timeout,
    /// Cancelled by an emergency stop.
    Aborted,
}

// ─── Homing Supervisor ──────────────────────────────────────────────

/// Per-axis homing state machine.
#[derive(Debug, Clone)]
pub struct HomingSupervisor {
    axis: AxisId,
    config: AxisHomingConfig,
    phase: HomingPhase,
    nominal_max_speed: f64,
    nominal_acceleration: f64,
}

impl HomingSupervisor {
    /// Save the axis' limits and start seeking.
    pub fn start(axis: AxisId, config: AxisHomingConfig, driver: &mut AxisDriver) -> Self {
        let supervisor = Self {
            axis,
            config,
            phase: HomingPhase::Seeking,
            nominal_max_speed: driver.max_speed(),
            nominal_acceleration: driver.acceleration(),
        };
        driver.halt();
        driver.set_acceleration(config.acceleration);
        driver.set_max_speed(config.speed);
        driver.set_speed(f64::from(config.direction.sign()) * config.speed);
        debug!(axis, speed = config.speed, direction = ?config.direction, "homing: seeking");
        supervisor
    }

    #[inline]
    pub fn axis(&self) -> AxisId {
        self.axis
    }

    #[inline]
    pub fn phase(&self) -> HomingPhase {
        self.phase
    }

    /// Advance with the raw switch level read this tick.
    pub fn tick(&mut self, driver: &mut AxisDriver, switch_level: bool) -> HomingPhase {
        match self.phase {
            HomingPhase::Seeking => {
                if self.config.switch_active(switch_level) {
                    driver.set_current_position(0);
                    driver.set_max_speed(self.nominal_max_speed);
                    if self.config.retract_steps == 0 {
                        self.finish(driver);
                    } else {
                        driver.set_target(self.config.retract_target());
                        self.phase = HomingPhase::Retracting;
                        debug!(axis = self.axis, "homing: switch hit, retracting");
                    }
                }
            }
            HomingPhase::Retracting => {
                if driver.is_settled() {
                    self.finish(driver);
                }
            }
            HomingPhase::Done | HomingPhase::Failed => {}
        }
        self.phase
    }

    /// Stop the axis and restore its nominal limits.
    pub fn abort(&mut self, driver: &mut AxisDriver) {
        if matches!(self.phase, HomingPhase::Done | HomingPhase::Failed) {
            return;
        }
        driver.halt();
        self.restore_limits(driver);
        self.phase = HomingPhase::Failed;
    }

    fn finish(&mut self, driver: &mut AxisDriver) {
        self.restore_limits(driver);
        driver.set_current_position(0);
        self.phase = HomingPhase::Done;
        debug!(axis = self.axis, "homing: done");
    }

    fn restore_limits(&self, driver: &mut AxisDriver) {
        driver.set_max_speed(self.nominal_max_speed);
        driver.set_acceleration(self.nominal_acceleration);
    }
}

// ─── Homing Session ─────────────────────────────────────────────────

/// Concurrent homing of one or more axes.
#[derive(Debug, Clone)]
pub struct HomingSession {
    axes: Vec<HomingSupervisor, MAX_AXES>,
    started_at: Duration,
    timeout: Option<Duration>,
}

impl HomingSession {
    /// Start homing every `(axis, config)` pair.
    ///
    /// The caller has checked that each axis exists, is enabled and is not
    /// part of a move. Entries past `MAX_AXES` are ignored.
    pub fn start(
        requests: &[(AxisId, AxisHomingConfig)],
        drivers: &mut [AxisDriver],
        now: Duration,
        timeout: Option<Duration>,
    ) -> Self {
        let mut axes = Vec::new();
        for &(axis, config) in requests {
            let Some(driver) = drivers.get_mut(axis) else {
                warn!(axis, "homing: no such axis");
                continue;
            };
            if axes
                .push(HomingSupervisor::start(axis, config, driver))
                .is_err()
            {
                break;
            }
        }
        info!(axes = axes.len(), ?timeout, "homing session started");
        Self {
            axes,
            started_at: now,
            timeout,
        }
    }

    /// Tick every unfinished axis with its switch level.
    pub fn tick(
        &mut self,
        drivers: &mut [AxisDriver],
        switches: &[bool],
        now: Duration,
    ) -> HomingTickResult {
        for sup in self.axes.iter_mut() {
            let axis = sup.axis();
            if let Some(driver) = drivers.get_mut(axis) {
                let level = switches.get(axis).copied().unwrap_or(false);
                sup.tick(driver, level);
            }
        }

        if self.is_complete() {
            return HomingTickResult::Complete;
        }
        if let Some(timeout) = self.timeout {
            if now.saturating_sub(self.started_at) >= timeout {
                warn!(?timeout, "homing timed out");
                self.abort(drivers);
                return HomingTickResult::Failed {
                    reason: HomingFailReason::Timeout,
                };
            }
        }
        HomingTickResult::InProgress
    }

    /// Abort every axis not yet Done.
    pub fn abort(&mut self, drivers: &mut [AxisDriver]) {
        for sup in self.axes.iter_mut() {
            if let Some(driver) = drivers.get_mut(sup.axis()) {
                sup.abort(driver);
            }
        }
    }

    /// Whether `axis` is still being homed.
    pub fn holds(&self, axis: AxisId) -> bool {
        self.axes
            .iter()
            .any(|s| s.axis() == axis && !matches!(s.phase(), HomingPhase::Done | HomingPhase::Failed))
    }

    pub fn phase(&self, axis: AxisId) -> Option<HomingPhase> {
        self.axes.iter().find(|s| s.axis() == axis).map(HomingSupervisor::phase)
    }

    pub fn is_complete(&self) -> bool {
        self.axes.iter().all(|s| s.phase() == HomingPhase::Done)
    }

    pub fn axes(&self) -> impl Iterator<Item = AxisId> + '_ {
        self.axes.iter().map(HomingSupervisor::axis)
    }
}
