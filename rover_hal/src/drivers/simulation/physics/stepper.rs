//! Stepper axis simulator.
//!
//! Counts rising edges of the step line while the driver is enabled and
//! reports a limit switch at a fixed physical position.

use rover_common::hal::config::SimAxisConfig;
use rover_common::hal::types::StepperLines;
use tracing::trace;

/// One simulated step/dir driver with its limit switch.
#[derive(Debug, Clone)]
pub struct StepperSimulator {
    /// Physical position in steps, relative to power-on.
    position: i64,
    /// Lines seen in the previous cycle (edge detection).
    last_lines: StepperLines,
    /// Switch position; pressed at and beyond it, away from 0.
    switch_position: i64,
    /// Total accepted step pulses.
    steps_seen: u64,
}

impl StepperSimulator {
    /// Create a simulator at physical position 0.
    pub fn new(config: SimAxisConfig) -> Self {
        Self {
            position: 0,
            last_lines: StepperLines::empty(),
            switch_position: config.switch_position,
            steps_seen: 0,
        }
    }

    /// Apply one cycle of output lines.
    pub fn update(&mut self, lines: StepperLines) {
        let rising =
            lines.contains(StepperLines::STEP) && !self.last_lines.contains(StepperLines::STEP);
        if rising && lines.contains(StepperLines::ENABLE) {
            self.position += if lines.contains(StepperLines::DIRECTION) { 1 } else { -1 };
            self.steps_seen += 1;
            trace!(position = self.position, "sim step");
        }
        self.last_lines = lines;
    }

    /// Switch level (high = pressed).
    pub fn switch_pressed(&self) -> bool {
        if self.switch_position < 0 {
            self.position <= self.switch_position
        } else {
            self.position >= self.switch_position
        }
    }

    /// Physical position in steps.
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Total step pulses applied.
    pub fn steps_seen(&self) -> u64 {
        self.steps_seen
    }

    /// Whether the motor is energized.
    pub fn enabled(&self) -> bool {
        self.last_lines.contains(StepperLines::ENABLE)
    }
}
