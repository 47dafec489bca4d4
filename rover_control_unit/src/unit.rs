//! The control unit: everything one tick touches.
//!
//! Owns the odometry estimator, the axis drivers, the homing session, the
//! move supervisor, the servo bank, the drive outputs and the stop latch.
//! Commands are applied as they are parsed; `tick()` then advances homing,
//! polls every axis, collects completions and integrates odometry.

use crate::actuator::{ServoBank, ServoError};
use crate::command::homing::{HomingSession, HomingTickResult};
use crate::command::parser::{Command, CommandTable, HomeTarget};
use crate::motion::{AxisDriver, AxisId, MoveError, MoveRequest, MoveSupervisor};
use crate::odometry::encoder::PulseCounter;
use crate::odometry::estimator::{Odometry, Pose};
use crate::report::{Replies, Reply, push_reply};
use crate::safety::stop::{EmergencyStop, StopTargets};
use heapless::Vec;
use rover_common::consts::MAX_AXES;
use rover_common::control_unit::config::FirmwareConfig;
use rover_common::control_unit::homing::AxisHomingConfig;
use rover_common::hal::types::{DrivePwm, HalCommands, HalStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct ControlUnit {
    odometry: Odometry,
    axes: Vec<AxisDriver, MAX_AXES>,
    axis_homing: Vec<Option<AxisHomingConfig>, MAX_AXES>,
    homing_timeout: Option<Duration>,
    homing: Option<HomingSession>,
    moves: MoveSupervisor,
    servos: ServoBank,
    drive: DrivePwm,
    estop: EmergencyStop,
    table: CommandTable,
    odometry_period: Duration,
    next_odometry: Duration,
    report_interval: Option<Duration>,
    next_report: Duration,
}

impl ControlUnit {
    /// Build from a validated configuration.
    pub fn new(config: &FirmwareConfig) -> Self {
        let pulse_width = Duration::from_micros(config.cycle.step_pulse_width_us.into());
        let mut axes = Vec::new();
        let mut axis_homing = Vec::new();
        for axis in config.axes.iter().take(MAX_AXES) {
            // Both vectors share the capacity bounded by take().
            let _ = axes.push(AxisDriver::from_config(axis, pulse_width));
            let _ = axis_homing.push(axis.homing);
        }
        if config.axes.len() > MAX_AXES {
            warn!(count = config.axes.len(), "more than {MAX_AXES} axes configured, extra ignored");
        }

        let report_interval = match config.cycle.report_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms.into())),
        };
        info!(
            axes = axes.len(),
            servos = config.servos.len(),
            ?report_interval,
            "control unit ready"
        );

        Self {
            odometry: Odometry::new(&config.odometry),
            axes,
            axis_homing,
            homing_timeout: config.homing.timeout(),
            homing: None,
            moves: MoveSupervisor::new(),
            servos: ServoBank::from_config(&config.servos),
            drive: DrivePwm::STOPPED,
            estop: EmergencyStop::new(),
            table: CommandTable::from_config(config),
            odometry_period: Duration::from_micros(config.cycle.odometry_period_us.into()),
            next_odometry: Duration::ZERO,
            report_interval,
            next_report: Duration::ZERO,
        }
    }

    /// Left and right pulse counters for the encoder edge sources.
    pub fn encoder_sinks(&self) -> (Arc<PulseCounter>, Arc<PulseCounter>) {
        self.odometry.edge_sinks()
    }

    // ─── Commands ───────────────────────────────────────────────────

    /// Parse and apply one line from the host.
    pub fn handle_line(&mut self, line: &str, now: Duration, replies: &mut Replies) {
        match self.table.parse(line) {
            Ok(command) => self.execute(command, now, replies),
            Err(e) => {
                debug!(line, error = %e, "rejected");
                push_reply(replies, Reply::Fail);
            }
        }
    }

    /// Apply a parsed command. Moves and homing reply later from `tick()`.
    pub fn execute(&mut self, command: Command, now: Duration, replies: &mut Replies) {
        let reply = match command {
            Command::ResetTicks => {
                self.odometry.reset_ticks();
                Some(Reply::Ok)
            }
            Command::SetPose(pose) => {
                self.odometry.set_pose(pose);
                Some(Reply::Ok)
            }
            Command::QueryPose => Some(Reply::Pose(self.odometry.pose())),
            Command::Move(request) => self.start_move(request),
            Command::SetServo { servo, angle } => Some(self.set_servo(servo, angle)),
            Command::Home(target) => self.start_homing(target, now),
            Command::EmergencyStop => {
                self.emergency_stop();
                Some(Reply::Stopped)
            }
            Command::Enable => {
                self.estop.release(&mut self.axes, &mut self.servos);
                Some(Reply::Ok)
            }
            Command::Drive(pwm) => {
                if self.estop.is_latched() {
                    Some(Reply::Disabled)
                } else {
                    self.drive = pwm;
                    Some(Reply::Ok)
                }
            }
        };
        if let Some(reply) = reply {
            push_reply(replies, reply);
        }
    }

    fn start_move(&mut self, request: MoveRequest) -> Option<Reply> {
        let homing = &self.homing;
        let held = |axis: AxisId| homing.as_ref().is_some_and(|h| h.holds(axis));
        match self.moves.start_move(request, &mut self.axes, held) {
            Ok(()) => None,
            Err(MoveError::Busy(axis)) => {
                debug!(axis, "move rejected: busy");
                Some(Reply::Busy)
            }
            Err(MoveError::Disabled(axis)) => {
                debug!(axis, "move rejected: disabled");
                Some(Reply::Disabled)
            }
            Err(e) => {
                debug!(error = %e, "move rejected");
                Some(Reply::Fail)
            }
        }
    }

    fn set_servo(&mut self, servo: usize, angle: u16) -> Reply {
        if self.estop.is_latched() {
            return Reply::Disabled;
        }
        match self.servos.set_angle(servo, angle) {
            Ok(()) => Reply::Ok,
            Err(ServoError::Detached(_)) => Reply::Disabled,
            Err(e) => {
                debug!(error = %e, "servo rejected");
                Reply::Fail
            }
        }
    }

    fn start_homing(&mut self, target: HomeTarget, now: Duration) -> Option<Reply> {
        let mut requests: Vec<(AxisId, AxisHomingConfig), MAX_AXES> = Vec::new();
        let home_servos = matches!(target, HomeTarget::All);
        match target {
            HomeTarget::All => {
                for (axis, homing) in self.axis_homing.iter().enumerate() {
                    if let Some(cfg) = homing {
                        let _ = requests.push((axis, *cfg));
                    }
                }
            }
            HomeTarget::Axes(axes) => {
                for axis in axes {
                    let Some(Some(cfg)) = self.axis_homing.get(axis) else {
                        debug!(axis, "homing rejected: axis has no homing configuration");
                        return Some(Reply::Fail);
                    };
                    let _ = requests.push((axis, *cfg));
                }
            }
        }
        if requests.is_empty() {
            return Some(Reply::Fail);
        }
        if self.homing.is_some() || requests.iter().any(|&(a, _)| self.moves.is_axis_moving(a)) {
            return Some(Reply::Busy);
        }
        if requests.iter().any(|&(a, _)| !self.axes[a].is_enabled()) {
            return Some(Reply::Disabled);
        }
        self.homing = Some(HomingSession::start(
            &requests,
            &mut self.axes,
            now,
            self.homing_timeout,
        ));
        // A full `h` also returns the servos to their home angles.
        if home_servos {
            self.servos.home_all();
        }
        None
    }

    /// Latch the emergency stop and apply it immediately.
    pub fn emergency_stop(&mut self) {
        self.estop.trigger(StopTargets {
            axes: &mut self.axes,
            moves: &mut self.moves,
            homing: &mut self.homing,
            servos: &mut self.servos,
            drive: &mut self.drive,
        });
    }

    // ─── Tick ───────────────────────────────────────────────────────

    /// Advance everything by one control tick.
    pub fn tick(&mut self, now: Duration, status: &HalStatus, replies: &mut Replies) {
        if let Some(session) = self.homing.as_mut() {
            match session.tick(&mut self.axes, &status.limit_switches, now) {
                HomingTickResult::InProgress => {}
                HomingTickResult::Complete => {
                    info!("homing complete");
                    self.homing = None;
                    push_reply(replies, Reply::Ok);
                }
                HomingTickResult::Failed { reason } => {
                    warn!(?reason, "homing failed");
                    self.homing = None;
                    push_reply(replies, Reply::HomingFailed);
                }
            }
        }

        for axis in self.axes.iter_mut() {
            axis.poll(now);
        }

        for _ in 0..self.moves.tick(&self.axes) {
            push_reply(replies, Reply::Ok);
        }

        if now >= self.next_odometry {
            self.odometry.update();
            self.next_odometry = advance(self.next_odometry, self.odometry_period, now);
        }

        if let Some(interval) = self.report_interval {
            if now >= self.next_report {
                push_reply(replies, Reply::Pose(self.odometry.pose()));
                self.next_report = advance(self.next_report, interval, now);
            }
        }
    }

    /// Output levels for the HAL.
    pub fn hal_commands(&self) -> HalCommands {
        let mut commands = HalCommands::default();
        for (lines, axis) in commands.steppers.iter_mut().zip(self.axes.iter()) {
            *lines = axis.lines();
        }
        self.servos.write_commands(&mut commands);
        commands.drive = self.drive;
        commands
    }

    // ─── Accessors ──────────────────────────────────────────────────

    pub fn pose(&self) -> Pose {
        self.odometry.pose()
    }

    pub fn odometry(&self) -> &Odometry {
        &self.odometry
    }

    pub fn axes(&self) -> &[AxisDriver] {
        &self.axes
    }

    pub fn axis(&self, axis: AxisId) -> Option<&AxisDriver> {
        self.axes.get(axis)
    }

    pub fn servos(&self) -> &ServoBank {
        &self.servos
    }

    pub fn drive(&self) -> DrivePwm {
        self.drive
    }

    pub fn moves(&self) -> &MoveSupervisor {
        &self.moves
    }

    pub fn homing(&self) -> Option<&HomingSession> {
        self.homing.as_ref()
    }

    pub fn is_homing(&self) -> bool {
        self.homing.is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.estop.is_latched()
    }

    pub fn emergency(&self) -> &EmergencyStop {
        &self.estop
    }
}

/// Next deadline on the `period` grid after `now`; resyncs after a stall.
fn advance(deadline: Duration, period: Duration, now: Duration) -> Duration {
    let next = deadline + period;
    if next <= now { now + period } else { next }
}
