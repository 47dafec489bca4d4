//! The seam between the control unit and the hardware.
//!
//! A driver turns [`HalCommands`] into pin levels once per tick and samples
//! the limit switches back into [`HalStatus`]. Encoder edges do not go
//! through the tick at all: the driver pushes them straight into an
//! [`EdgeSink`] from wherever it observes them.

use crate::hal::config::HalConfig;
use crate::hal::types::{HalCommands, HalStatus};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// The hardware (or plant) could not be brought up.
    #[error("HAL init failed: {0}")]
    InitFailed(String),

    /// Rejected driver parameters or registration.
    #[error("HAL configuration error: {0}")]
    ConfigError(String),

    #[error("unknown HAL driver '{0}'")]
    DriverNotFound(String),
}

/// Constructor stored in the driver registry.
pub type DriverFactory = fn() -> Box<dyn HalDriver>;

/// Counters a driver may expose for shutdown logs and tests.
#[derive(Debug, Clone, Default)]
pub struct DriverDiagnostics {
    pub cycle_count: u64,
    /// Rising step edges seen, per axis.
    pub steps_seen: Vec<u64>,
    /// Encoder edges raised `(left, right)`.
    pub encoder_edges: (u64, u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderSide {
    Left,
    Right,
}

/// Receiver of quadrature edges.
///
/// Runs in interrupt context or on a driver thread, so implementors only
/// touch atomics.
pub trait EdgeSink: Send + Sync {
    /// One transition of phase A, with both phase levels sampled after it.
    fn on_edge(&self, phase_a: bool, phase_b: bool);
}

/// A stepper/servo/drive output stage plus its switch inputs.
///
/// Call order: `init`, `attach_encoder` for each wheel, `cycle` once per
/// control tick, `shutdown`. Only `cycle` runs inside the timed loop; it
/// must not block or allocate.
pub trait HalDriver: Send {
    /// Registry name, e.g. `"simulation"`.
    fn name(&self) -> &'static str;

    fn version(&self) -> &'static str;

    /// Prepare outputs for `axis_count` stepper axes.
    ///
    /// # Errors
    /// `HalError::InitFailed` when the axes cannot be served.
    fn init(&mut self, config: &HalConfig, axis_count: usize) -> Result<(), HalError>;

    /// Deliver edges of one wheel encoder to `sink`.
    fn attach_encoder(&mut self, side: EncoderSide, sink: Arc<dyn EdgeSink>);

    /// Drive the outputs to `commands` and sample the inputs. `dt` is the
    /// time since the previous call.
    fn cycle(&mut self, commands: &HalCommands, dt: Duration) -> HalStatus;

    /// Leave every output de-energized.
    fn shutdown(&mut self) -> Result<(), HalError>;

    fn diagnostics(&self) -> Option<DriverDiagnostics> {
        None
    }
}
