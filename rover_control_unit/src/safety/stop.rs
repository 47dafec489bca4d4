//! Emergency stop.
//!
//! Triggering applies everything in one call, so the stop lands in the
//! same tick that parsed it:
//!
//! 1. abort the homing session (limits restored)
//! 2. cancel active moves without completion reports
//! 3. halt and disable every axis
//! 4. detach every servo
//! 5. zero the drive PWM
//!
//! The latch holds until [`EmergencyStop::release`].

use crate::actuator::ServoBank;
use crate::command::homing::HomingSession;
use crate::motion::{AxisDriver, MoveSupervisor};
use rover_common::hal::types::DrivePwm;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopState {
    #[default]
    Armed,
    Latched,
}

/// Everything a stop touches.
pub struct StopTargets<'a> {
    pub axes: &'a mut [AxisDriver],
    pub moves: &'a mut MoveSupervisor,
    pub homing: &'a mut Option<HomingSession>,
    pub servos: &'a mut ServoBank,
    pub drive: &'a mut DrivePwm,
}

/// What a trigger interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StopReport {
    pub moves_cancelled: usize,
    pub homing_aborted: bool,
    pub axes_disabled: usize,
}

#[derive(Debug, Default)]
pub struct EmergencyStop {
    state: StopState,
    triggered: u64,
}

impl EmergencyStop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop everything. Repeating it while latched is harmless.
    pub fn trigger(&mut self, targets: StopTargets<'_>) -> StopReport {
        let StopTargets {
            axes,
            moves,
            homing,
            servos,
            drive,
        } = targets;

        let homing_aborted = match homing.take() {
            Some(mut session) => {
                session.abort(axes);
                true
            }
            None => false,
        };
        let moves_cancelled = moves.cancel_all();
        for axis in axes.iter_mut() {
            axis.disable();
        }
        servos.detach_all();
        *drive = DrivePwm::STOPPED;

        self.state = StopState::Latched;
        self.triggered += 1;
        let report = StopReport {
            moves_cancelled,
            homing_aborted,
            axes_disabled: axes.len(),
        };
        warn!(
            moves = report.moves_cancelled,
            homing = report.homing_aborted,
            "emergency stop"
        );
        report
    }

    /// Re-enable axes and re-attach servos.
    pub fn release(&mut self, axes: &mut [AxisDriver], servos: &mut ServoBank) {
        for axis in axes.iter_mut() {
            axis.enable();
        }
        servos.attach_all();
        if self.state == StopState::Latched {
            info!("emergency stop released");
        }
        self.state = StopState::Armed;
    }

    #[inline]
    pub fn state(&self) -> StopState {
        self.state
    }

    #[inline]
    pub fn is_latched(&self) -> bool {
        self.state == StopState::Latched
    }

    /// Number of triggers since start.
    pub fn trigger_count(&self) -> u64 {
        self.triggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::homing::HomingPhase;
    use crate::motion::MoveRequest;
    use rover_common::control_unit::config::FirmwareConfig;
    use std::time::Duration;

    struct Rig {
        axes: Vec<AxisDriver>,
        moves: MoveSupervisor,
        homing: Option<HomingSession>,
        servos: ServoBank,
        drive: DrivePwm,
    }

    impl Rig {
        fn new() -> Self {
            let cfg = FirmwareConfig::default();
            Self {
                axes: cfg
                    .axes
                    .iter()
                    .map(|a| AxisDriver::from_config(a, Duration::from_micros(20)))
                    .collect(),
                moves: MoveSupervisor::new(),
                homing: None,
                servos: ServoBank::from_config(&cfg.servos),
                drive: DrivePwm::from_channels([100, 0, 100, 0]),
            }
        }

        fn targets(&mut self) -> StopTargets<'_> {
            StopTargets {
                axes: &mut self.axes,
                moves: &mut self.moves,
                homing: &mut self.homing,
                servos: &mut self.servos,
                drive: &mut self.drive,
            }
        }
    }

    #[test]
    fn stop_mid_move_disables_everything() {
        let mut rig = Rig::new();
        rig.moves
            .start_move(MoveRequest::single(0, 1000), &mut rig.axes, |_| false)
            .unwrap();
        let mut now = Duration::ZERO;
        for _ in 0..200 {
            rig.axes[0].poll(now);
            now += Duration::from_micros(200);
        }
        assert!(rig.axes[0].current_position() > 0);

        let mut estop = EmergencyStop::new();
        let report = estop.trigger(rig.targets());
        assert_eq!(report.moves_cancelled, 1);
        assert!(!report.homing_aborted);
        assert!(estop.is_latched());
        assert_eq!(rig.moves.active_count(), 0);
        assert!(rig.drive.is_stopped());
        for axis in &rig.axes {
            assert!(!axis.is_enabled());
            assert!(axis.lines().is_empty());
            assert_eq!(axis.distance_to_go(), 0);
        }
        assert!(!rig.servos.get(0).unwrap().is_attached());

        let stopped_at = rig.axes[0].current_position();
        assert!(!rig.axes[0].set_target(stopped_at + 100));
        assert_eq!(rig.axes[0].target_position(), stopped_at);
    }

    #[test]
    fn stop_aborts_homing() {
        let mut rig = Rig::new();
        let cfg = FirmwareConfig::default();
        let homing = cfg.axes[0].homing.unwrap();
        rig.homing = Some(HomingSession::start(&[(0, homing)], &mut rig.axes, Duration::ZERO, None));
        assert_eq!(rig.axes[0].max_speed(), homing.speed);

        let report = EmergencyStop::new().trigger(rig.targets());
        assert!(report.homing_aborted);
        assert!(rig.homing.is_none());
        assert_eq!(rig.axes[0].max_speed(), cfg.axes[0].max_speed);
        assert_eq!(rig.axes[0].acceleration(), cfg.axes[0].acceleration);
    }

    #[test]
    fn release_re_enables() {
        let mut rig = Rig::new();
        let mut estop = EmergencyStop::new();
        estop.trigger(rig.targets());
        estop.trigger(rig.targets());
        assert_eq!(estop.trigger_count(), 2);

        estop.release(&mut rig.axes, &mut rig.servos);
        assert_eq!(estop.state(), StopState::Armed);
        assert!(rig.axes.iter().all(AxisDriver::is_enabled));
        assert!(rig.servos.get(6).unwrap().is_attached());
        assert!(rig.axes[1].set_target(10));
    }

    #[test]
    fn aborted_session_reports_failed_phase() {
        let mut rig = Rig::new();
        let homing = FirmwareConfig::default().axes[0].homing.unwrap();
        let mut session = HomingSession::start(&[(0, homing)], &mut rig.axes, Duration::ZERO, None);
        session.abort(&mut rig.axes);
        assert_eq!(session.phase(0), Some(HomingPhase::Failed));
    }
}
