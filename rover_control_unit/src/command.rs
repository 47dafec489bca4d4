//! Command processing root.
//!
//! Serial line parsing into typed commands and homing supervision.

pub mod homing;
pub mod parser;
