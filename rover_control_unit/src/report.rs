//! Status lines sent back to the host.

use crate::odometry::estimator::Pose;
use heapless::Vec;
use rover_common::consts::REPLY_QUEUE_DEPTH;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    Ok,
    /// Malformed or rejected command.
    Fail,
    Busy,
    Disabled,
    Stopped,
    HomingFailed,
    Pose(Pose),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::Fail => f.write_str("f"),
            Self::Busy => f.write_str("busy"),
            Self::Disabled => f.write_str("disabled"),
            Self::Stopped => f.write_str("stopped"),
            Self::HomingFailed => f.write_str("homing_failed"),
            Self::Pose(pose) => {
                // Whole millimetres, degrees with two decimals in [0, 360).
                let mut deg = (pose.theta_degrees() * 100.0).round() / 100.0;
                if deg >= 360.0 {
                    deg = 0.0;
                }
                write!(f, "p{};{};{:.2}", pose.x.round() as i64, pose.y.round() as i64, deg)
            }
        }
    }
}

/// Replies produced in one tick.
pub type Replies = Vec<Reply, REPLY_QUEUE_DEPTH>;

/// Queue a reply; drops it with a warning when the tick's queue is full.
pub fn push_reply(replies: &mut Replies, reply: Reply) {
    if replies.push(reply).is_err() {
        warn!(%reply, "reply queue full, dropping");
    }
}
