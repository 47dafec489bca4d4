//! Stepper motion: per-axis step generation and coordinated moves.

pub mod axis;
pub mod supervisor;

pub use axis::{AxisDriver, AxisId, AxisPoll};
pub use supervisor::{MoveError, MoveRequest, MoveSupervisor};
