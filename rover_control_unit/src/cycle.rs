//! Periodic control cycle: input → tick → output.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)` to lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity` to pin to one CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)`.
//!
//! ## Cycle Loop
//! With the `rt` feature, absolute-time sleep on `CLOCK_MONOTONIC`;
//! otherwise `thread::sleep` for the remainder of the tick. An overrun is
//! counted and logged; the loop keeps going.
//!
//! ## Cycle Body
//! 1. Apply up to `COMMANDS_PER_CYCLE` received lines; later lines wait.
//! 2. `ControlUnit::tick` with the inputs sampled last cycle.
//! 3. Hand the new outputs to the HAL driver and keep its status.
//! 4. Write the replies of this cycle to the link.

use crate::link::SerialLink;
use crate::report::Replies;
use crate::unit::ControlUnit;
use rover_common::consts::COMMANDS_PER_CYCLE;
use rover_common::control_unit::config::FirmwareConfig;
use rover_common::hal::driver::{EncoderSide, HalDriver, HalError};
use rover_common::hal::types::{HalCommands, HalStatus};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    pub sum_cycle_ns: i64,
    /// Cycles whose body ran past the tick.
    pub overruns: u64,
    /// Maximum wake-up latency [ns].
    pub max_latency_ns: i64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (0 before the first cycle).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),
    #[error("HAL error: {0}")]
    Hal(#[from] HalError),
    #[error("serial link error: {0}")]
    Link(#[from] io::Error),
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages.
///
/// No-op when the `rt` feature is not enabled.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch 256 KiB of stack so the loop never faults a page in.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Full RT setup; all no-ops without the `rt` feature.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Owns the control unit, the HAL driver and the link.
pub struct CycleRunner {
    unit: ControlUnit,
    driver: Box<dyn HalDriver>,
    link: SerialLink,
    status: HalStatus,
    cycle_time: Duration,
    /// Control time of the last executed cycle.
    now: Duration,
    stats: CycleStats,
    running: Arc<AtomicBool>,
    max_cycles: Option<u64>,
    link_failed: bool,
}

impl CycleRunner {
    /// Initialise `driver` and wire its encoder edges to the odometry.
    pub fn new(
        config: &FirmwareConfig,
        mut driver: Box<dyn HalDriver>,
        link: SerialLink,
    ) -> Result<Self, CycleError> {
        let unit = ControlUnit::new(config);
        driver.init(&config.hal, unit.axes().len())?;
        let (left, right) = unit.encoder_sinks();
        driver.attach_encoder(EncoderSide::Left, left);
        driver.attach_encoder(EncoderSide::Right, right);
        info!(
            driver = driver.name(),
            version = driver.version(),
            cycle_time_us = config.cycle.cycle_time_us,
            "cycle runner ready"
        );

        Ok(Self {
            unit,
            driver,
            link,
            status: HalStatus::default(),
            cycle_time: Duration::from_micros(config.cycle.cycle_time_us.into()),
            now: Duration::ZERO,
            stats: CycleStats::new(),
            running: Arc::new(AtomicBool::new(true)),
            max_cycles: None,
            link_failed: false,
        })
    }

    /// Stop after `cycles` cycles.
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    /// Cleared to leave the loop (e.g. from a signal handler).
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run until the running flag clears or the cycle budget is spent,
    /// then shut the driver down.
    pub fn run(&mut self) -> Result<(), CycleError> {
        #[cfg(feature = "rt")]
        let result = self.run_rt_loop();
        #[cfg(not(feature = "rt"))]
        let result = self.run_sim_loop();

        self.shutdown()?;
        result
    }

    fn should_continue(&self) -> bool {
        self.running.load(Ordering::Relaxed)
            && self.max_cycles.is_none_or(|max| self.stats.cycle_count < max)
    }

    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self) -> Result<(), CycleError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let gettime =
            || clock_gettime(clock).map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")));
        let cycle_ns = self.cycle_time.as_nanos() as i64;
        let start = gettime()?;
        let mut next_wake = start;

        while self.should_continue() {
            next_wake = timespec_add_ns(next_wake, cycle_ns);

            let cycle_start = gettime()?;
            let wake_latency_ns = timespec_diff_ns(&cycle_start, &next_wake).abs();
            let now = Duration::from_nanos(timespec_diff_ns(&cycle_start, &start).max(0) as u64);

            self.cycle_body(now);

            let duration_ns = timespec_diff_ns(&gettime()?, &cycle_start);
            self.finish_cycle(duration_ns, wake_latency_ns);

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }

    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self) -> Result<(), CycleError> {
        use std::time::Instant;

        let start = Instant::now();
        while self.should_continue() {
            let cycle_start = Instant::now();

            self.cycle_body(cycle_start.duration_since(start));

            let elapsed = cycle_start.elapsed();
            self.finish_cycle(elapsed.as_nanos() as i64, 0);

            if let Some(remaining) = self.cycle_time.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
        Ok(())
    }

    fn finish_cycle(&mut self, duration_ns: i64, latency_ns: i64) {
        self.stats.record(duration_ns, latency_ns);
        if duration_ns > self.cycle_time.as_nanos() as i64 {
            self.stats.overruns += 1;
            if self.stats.overruns.is_power_of_two() {
                warn!(
                    duration_ns,
                    overruns = self.stats.overruns,
                    "cycle overrun"
                );
            }
        }
    }

    /// Run one cycle at `cycle_time` after the previous one, without
    /// sleeping. Used for deterministic stepping.
    pub fn step(&mut self) {
        let now = self.now + self.cycle_time;
        self.cycle_body(now);
        self.stats.record(0, 0);
    }

    /// One control cycle at control time `now`.
    pub fn cycle_body(&mut self, now: Duration) {
        let dt = now.saturating_sub(self.now);
        self.now = now;
        let mut replies = Replies::new();

        // Leave room for what the tick itself reports.
        for _ in 0..COMMANDS_PER_CYCLE {
            let Some(line) = self.link.try_recv() else {
                break;
            };
            self.unit.handle_line(&line, now, &mut replies);
        }

        self.unit.tick(now, &self.status, &mut replies);

        let commands = self.unit.hal_commands();
        self.status = self.driver.cycle(&commands, dt);

        for reply in replies.iter() {
            if let Err(e) = self.link.send(reply) {
                if !self.link_failed {
                    warn!(error = %e, "reply write failed");
                    self.link_failed = true;
                }
                break;
            }
        }
    }

    /// De-energise all outputs and shut the driver down.
    pub fn shutdown(&mut self) -> Result<(), CycleError> {
        self.driver.cycle(&HalCommands::default(), Duration::ZERO);
        self.driver.shutdown()?;
        info!(
            cycles = self.stats.cycle_count,
            avg_ns = self.stats.avg_cycle_ns(),
            max_ns = self.stats.max_cycle_ns,
            overruns = self.stats.overruns,
            odometry_updates = self.unit.odometry().updates(),
            "cycle runner stopped"
        );
        if let Some(diag) = self.driver.diagnostics() {
            debug!(?diag, "driver diagnostics");
        }
        Ok(())
    }

    pub fn unit(&self) -> &ControlUnit {
        &self.unit
    }

    pub fn driver(&self) -> &dyn HalDriver {
        self.driver.as_ref()
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Control time of the last cycle.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn last_status(&self) -> &HalStatus {
        &self.status
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let mut secs = ts.tv_sec();
    let mut nanos = ts.tv_nsec() + ns;
    while nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    while nanos < 0 {
        secs -= 1;
        nanos += 1_000_000_000;
    }
    TimeSpec::new(secs, nanos)
}

/// `a - b` in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
