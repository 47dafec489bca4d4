//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements the `HalDriver` trait to emulate the
//! rover's stepper axes, limit switches, servos and drive wheels without
//! physical hardware.

use super::physics::{StepperSimulator, WheelSimulator};
use rover_common::consts::{MAX_AXES, MAX_SERVOS};
use rover_common::hal::config::HalConfig;
use rover_common::hal::driver::{DriverDiagnostics, EdgeSink, EncoderSide, HalDriver, HalError};
use rover_common::hal::types::{DrivePwm, HalCommands, HalStatus, ServoCommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Simulation driver implementing the HalDriver trait.
pub struct SimulationDriver {
    /// Driver name
    name: &'static str,
    /// Driver version
    version: &'static str,
    /// Initialized flag
    initialized: bool,
    /// Stepper simulators (one per configured axis)
    steppers: Vec<StepperSimulator>,
    left: WheelSimulator,
    right: WheelSimulator,
    /// Servo outputs applied in the last cycle
    servos: [ServoCommand; MAX_SERVOS],
    /// Drive PWM applied in the last cycle
    drive: DrivePwm,
    cycle_count: u64,
}

impl SimulationDriver {
    /// Create a new simulation driver instance.
    pub fn new() -> Self {
        Self {
            name: "simulation",
            version: env!("CARGO_PKG_VERSION"),
            initialized: false,
            steppers: Vec::new(),
            left: WheelSimulator::new(0.0),
            right: WheelSimulator::new(0.0),
            servos: [ServoCommand::default(); MAX_SERVOS],
            drive: DrivePwm::STOPPED,
            cycle_count: 0,
        }
    }

    /// Stepper simulator of axis `index`.
    pub fn stepper(&self, index: usize) -> Option<&StepperSimulator> {
        self.steppers.get(index)
    }

    /// Servo output of slot `index` applied in the last cycle.
    pub fn servo(&self, index: usize) -> Option<ServoCommand> {
        self.servos.get(index).copied()
    }

    /// Drive PWM applied in the last cycle.
    pub fn drive(&self) -> DrivePwm {
        self.drive
    }

    /// Wheel simulator for `side`.
    pub fn wheel(&self, side: EncoderSide) -> &WheelSimulator {
        match side {
            EncoderSide::Left => &self.left,
            EncoderSide::Right => &self.right,
        }
    }

    /// Whether `init()` succeeded and `shutdown()` has not run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl HalDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn init(&mut self, config: &HalConfig, axis_count: usize) -> Result<(), HalError> {
        if axis_count > MAX_AXES {
            return Err(HalError::InitFailed(format!(
                "{axis_count} axes requested, simulation supports {MAX_AXES}"
            )));
        }
        let sim = &config.simulation;
        sim.validate()
            .map_err(|e| HalError::ConfigError(e.to_string()))?;

        self.steppers = (0..axis_count)
            .map(|idx| StepperSimulator::new(sim.axis(idx)))
            .collect();
        self.left = WheelSimulator::new(sim.wheel_ticks_per_pwm_second);
        self.right = WheelSimulator::new(sim.wheel_ticks_per_pwm_second);
        self.servos = [ServoCommand::default(); MAX_SERVOS];
        self.drive = DrivePwm::STOPPED;
        self.cycle_count = 0;
        self.initialized = true;

        info!(
            "Simulation driver initialized with {} axes, {} ticks/s per PWM unit",
            axis_count, sim.wheel_ticks_per_pwm_second
        );
        Ok(())
    }

    fn attach_encoder(&mut self, side: EncoderSide, sink: Arc<dyn EdgeSink>) {
        debug!(?side, "encoder attached");
        match side {
            EncoderSide::Left => self.left.attach(sink),
            EncoderSide::Right => self.right.attach(sink),
        }
    }

    fn cycle(&mut self, commands: &HalCommands, dt: Duration) -> HalStatus {
        let mut status = HalStatus::default();
        if !self.initialized {
            return status;
        }
        self.cycle_count += 1;

        for (idx, stepper) in self.steppers.iter_mut().enumerate() {
            stepper.update(commands.steppers[idx]);
            status.limit_switches[idx] = stepper.switch_pressed();
        }

        for (idx, (applied, cmd)) in self.servos.iter_mut().zip(&commands.servos).enumerate() {
            if applied.attached != cmd.attached {
                debug!(servo = idx, attached = cmd.attached, "servo attach changed");
            }
            *applied = *cmd;
        }

        self.drive = commands.drive;
        self.left.update(commands.drive.left_net(), dt);
        self.right.update(commands.drive.right_net(), dt);

        status
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        info!(
            "Shutting down simulation driver after {} cycles",
            self.cycle_count
        );
        self.servos = [ServoCommand::default(); MAX_SERVOS];
        self.drive = DrivePwm::STOPPED;
        self.initialized = false;
        Ok(())
    }

    fn diagnostics(&self) -> Option<DriverDiagnostics> {
        Some(DriverDiagnostics {
            cycle_count: self.cycle_count,
            steps_seen: self.steppers.iter().map(|s| s.steps_seen()).collect(),
            encoder_edges: (self.left.edges(), self.right.edges()),
        })
    }
}
