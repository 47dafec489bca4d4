//! Safety root.
//!
//! Emergency stop latch and its release.

pub mod stop;
