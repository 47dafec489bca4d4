//! Quadrature pulse counting.
//!
//! `PulseCounter` is the only state touched by the edge handler. It is a
//! single `AtomicI32`, so the estimator never observes a torn count.
//! `EncoderAxis` pairs a counter with the estimator's last snapshot.

use rover_common::hal::driver::EdgeSink;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

/// Signed tick count of one wheel encoder.
#[derive(Debug, Default)]
pub struct PulseCounter {
    ticks: AtomicI32,
}

impl PulseCounter {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicI32::new(0),
        }
    }

    /// Count one transition of phase A. B different from A means forward.
    #[inline]
    pub fn record_edge(&self, phase_a: bool, phase_b: bool) {
        if phase_b != phase_a {
            self.ticks.fetch_add(1, Ordering::Relaxed);
        } else {
            self.ticks.fetch_sub(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn ticks(&self) -> i32 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.ticks.store(0, Ordering::Relaxed);
    }
}

impl EdgeSink for PulseCounter {
    #[inline]
    fn on_edge(&self, phase_a: bool, phase_b: bool) {
        self.record_edge(phase_a, phase_b);
    }
}

/// One wheel: the shared counter plus the estimator-owned snapshot.
#[derive(Debug, Default)]
pub struct EncoderAxis {
    counter: Arc<PulseCounter>,
    last_sampled: i32,
}

impl EncoderAxis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the edge handler.
    pub fn counter(&self) -> Arc<PulseCounter> {
        Arc::clone(&self.counter)
    }

    /// Ticks counted since the previous sample.
    ///
    /// One atomic load; an edge arriving after it is picked up by the next
    /// sample. The difference wraps with the counter.
    #[inline]
    pub fn sample(&mut self) -> i32 {
        let now = self.counter.ticks();
        let delta = now.wrapping_sub(self.last_sampled);
        self.last_sampled = now;
        delta
    }

    /// Zero both the counter and the snapshot.
    pub fn reset(&mut self) {
        self.counter.reset();
        self.last_sampled = 0;
    }

    #[inline]
    pub fn tick_count(&self) -> i32 {
        self.counter.ticks()
    }

    #[inline]
    pub fn last_sampled(&self) -> i32 {
        self.last_sampled
    }
}
