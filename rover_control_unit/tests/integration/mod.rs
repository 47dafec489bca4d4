//! Shared test rig: a `ControlUnit` wired to a `SimulationDriver`.

mod coordinated_move;
mod cycle;
mod emergency_stop;
mod homing;
mod odometry;
mod protocol;

use rover_common::control_unit::config::FirmwareConfig;
use rover_common::hal::driver::{EncoderSide, HalDriver};
use rover_common::hal::types::HalStatus;
use rover_control_unit::report::{Replies, Reply};
use rover_control_unit::unit::ControlUnit;
use rover_hal::drivers::simulation::SimulationDriver;
use std::time::Duration;

pub const TICK: Duration = Duration::from_micros(200);

pub struct Rig {
    pub unit: ControlUnit,
    pub hal: SimulationDriver,
    status: HalStatus,
    pub now: Duration,
}

impl Rig {
    pub fn new(config: &FirmwareConfig) -> Self {
        let unit = ControlUnit::new(config);
        let mut hal = SimulationDriver::new();
        hal.init(&config.hal, unit.axes().len()).unwrap();
        let (left, right) = unit.encoder_sinks();
        hal.attach_encoder(EncoderSide::Left, left);
        hal.attach_encoder(EncoderSide::Right, right);
        Self {
            unit,
            hal,
            status: HalStatus::default(),
            now: Duration::ZERO,
        }
    }

    pub fn rover() -> Self {
        Self::new(&FirmwareConfig::default())
    }

    /// Apply one line at the current time.
    pub fn send(&mut self, line: &str) -> Vec<Reply> {
        let mut replies = Replies::new();
        self.unit.handle_line(line, self.now, &mut replies);
        replies.iter().copied().collect()
    }

    /// One control tick followed by one HAL cycle.
    pub fn tick(&mut self) -> Vec<Reply> {
        self.now += TICK;
        let mut replies = Replies::new();
        self.unit.tick(self.now, &self.status, &mut replies);
        let commands = self.unit.hal_commands();
        self.status = self.hal.cycle(&commands, TICK);
        replies.iter().copied().collect()
    }

    /// Tick `count` times, collecting replies.
    pub fn run(&mut self, count: usize) -> Vec<Reply> {
        (0..count).flat_map(|_| self.tick()).collect()
    }

    /// Tick until a reply matches; returns every reply up to and including
    /// it, or `None` after `max_ticks`.
    pub fn run_until(&mut self, max_ticks: usize, pred: impl Fn(&Reply) -> bool) -> Option<Vec<Reply>> {
        let mut seen = Vec::new();
        for _ in 0..max_ticks {
            for reply in self.tick() {
                let hit = pred(&reply);
                seen.push(reply);
                if hit {
                    return Some(seen);
                }
            }
        }
        None
    }

    pub fn position(&self, axis: usize) -> i32 {
        self.unit.axes()[axis].current_position()
    }

    pub fn sim_position(&self, axis: usize) -> i64 {
        self.hal.stepper(axis).unwrap().position()
    }
}
