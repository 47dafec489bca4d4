//! Drive wheel simulator.
//!
//! Converts net PWM duty into encoder travel and raises one quadrature edge
//! per tick on the attached sink. Forward travel leaves phase B different
//! from phase A after each A transition.

use rover_common::hal::driver::EdgeSink;
use std::sync::Arc;
use std::time::Duration;

/// One drive wheel with its incremental encoder.
pub struct WheelSimulator {
    /// Encoder ticks per second per unit of net PWM duty.
    ticks_per_pwm_second: f64,
    /// Sub-tick travel carried to the next cycle.
    fraction: f64,
    phase_a: bool,
    phase_b: bool,
    /// Signed ticks produced since start.
    ticks: i64,
    edges: u64,
    sink: Option<Arc<dyn EdgeSink>>,
}

impl WheelSimulator {
    /// Create a stopped wheel.
    pub fn new(ticks_per_pwm_second: f64) -> Self {
        Self {
            ticks_per_pwm_second,
            fraction: 0.0,
            phase_a: false,
            phase_b: false,
            ticks: 0,
            edges: 0,
            sink: None,
        }
    }

    /// Route encoder edges to `sink`.
    pub fn attach(&mut self, sink: Arc<dyn EdgeSink>) {
        self.sink = Some(sink);
    }

    /// Advance the wheel by `dt` at `net_duty` (-255..=255, forward positive).
    pub fn update(&mut self, net_duty: i16, dt: Duration) {
        let travel = f64::from(net_duty) * self.ticks_per_pwm_second * dt.as_secs_f64();
        self.fraction += travel;
        let whole = self.fraction.trunc();
        self.fraction -= whole;

        let forward = whole > 0.0;
        for _ in 0..(whole.abs() as u64) {
            self.edge(forward);
        }
    }

    fn edge(&mut self, forward: bool) {
        self.phase_a = !self.phase_a;
        self.phase_b = if forward { !self.phase_a } else { self.phase_a };
        self.ticks += if forward { 1 } else { -1 };
        self.edges += 1;
        if let Some(sink) = &self.sink {
            sink.on_edge(self.phase_a, self.phase_b);
        }
    }

    /// Signed ticks produced since start.
    pub fn ticks(&self) -> i64 {
        self.ticks
    }

    /// Edges raised since start.
    pub fn edges(&self) -> u64 {
        self.edges
    }
}
