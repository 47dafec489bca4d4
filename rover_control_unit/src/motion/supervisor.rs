//! Coordinated multi-axis moves.
//!
//! A `MoveRequest` fans one logical move out to several axes. The
//! supervisor reports it complete exactly once, in the tick where the last
//! participating axis settles.

use super::axis::{AxisDriver, AxisId};
use heapless::Vec;
use rover_common::consts::MAX_AXES;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("axis {0} is held by homing or another move")]
    Busy(AxisId),
    #[error("axis {0} is disabled")]
    Disabled(AxisId),
    #[error("axis {0} does not exist")]
    UnknownAxis(AxisId),
    #[error("axis {0} named twice")]
    DuplicateAxis(AxisId),
    #[error("more than {MAX_AXES} axes in one move")]
    TooManyAxes,
    #[error("move names no axis")]
    Empty,
}

/// Per-axis absolute targets of one move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveRequest {
    targets: Vec<(AxisId, i32), MAX_AXES>,
}

impl MoveRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(axis: AxisId, target: i32) -> Self {
        let mut request = Self::new();
        // An empty request always has room for one axis.
        let _ = request.targets.push((axis, target));
        request
    }

    pub fn push(&mut self, axis: AxisId, target: i32) -> Result<(), MoveError> {
        if self.contains(axis) {
            return Err(MoveError::DuplicateAxis(axis));
        }
        self.targets
            .push((axis, target))
            .map_err(|_| MoveError::TooManyAxes)
    }

    pub fn contains(&self, axis: AxisId) -> bool {
        self.targets.iter().any(|(a, _)| *a == axis)
    }

    pub fn axes(&self) -> impl Iterator<Item = AxisId> + '_ {
        self.targets.iter().map(|(a, _)| *a)
    }

    pub fn targets(&self) -> &[(AxisId, i32)] {
        &self.targets
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Tracks active moves; at most one per axis.
#[derive(Debug, Default)]
pub struct MoveSupervisor {
    active: Vec<MoveRequest, MAX_AXES>,
    completed: u64,
}

impl MoveSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and start a move.
    ///
    /// Rejected with `Busy` if `is_held` claims any named axis or another
    /// move owns it, with `Disabled` if any named axis is disabled. Nothing
    /// is changed on rejection.
    pub fn start_move(
        &mut self,
        request: MoveRequest,
        axes: &mut [AxisDriver],
        is_held: impl Fn(AxisId) -> bool,
    ) -> Result<(), MoveError> {
        if request.is_empty() {
            return Err(MoveError::Empty);
        }
        for axis in request.axes() {
            if axis >= axes.len() {
                return Err(MoveError::UnknownAxis(axis));
            }
            if is_held(axis) || self.is_axis_moving(axis) {
                return Err(MoveError::Busy(axis));
            }
        }
        if let Some(axis) = request.axes().find(|&a| !axes[a].is_enabled()) {
            return Err(MoveError::Disabled(axis));
        }

        let first = request.axes().next().unwrap_or_default();
        self.active
            .push(request)
            .map_err(|_| MoveError::Busy(first))?;
        if let Some(started) = self.active.last() {
            for &(axis, target) in started.targets() {
                axes[axis].set_target(target);
            }
            debug!(targets = ?started.targets(), "move started");
        }
        Ok(())
    }

    /// Drop every move whose axes have all settled; returns how many.
    pub fn tick(&mut self, axes: &[AxisDriver]) -> usize {
        let before = self.active.len();
        self.active.retain(|request| {
            !request
                .targets()
                .iter()
                .all(|&(axis, _)| axes.get(axis).is_none_or(AxisDriver::is_settled))
        });
        let done = before - self.active.len();
        self.completed += done as u64;
        done
    }

    /// Forget every active move without reporting completion.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.active.len();
        self.active.clear();
        cancelled
    }

    pub fn is_axis_moving(&self, axis: AxisId) -> bool {
        self.active.iter().any(|m| m.contains(axis))
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Moves reported complete since start.
    pub fn completed(&self) -> u64 {
        self.completed
    }
}
