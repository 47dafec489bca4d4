//! # Rover HAL Library
//!
//! HAL driver implementations with a pluggable driver registry.
//! Drivers implement the `HalDriver` trait defined in
//! `rover_common::hal::driver`.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - HAL driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      rover_control_unit                    │
//! │   CycleRunner ── HalCommands ──►  Box<dyn HalDriver>       │
//! │        ▲                               │                   │
//! │        └──────── HalStatus ◄───────────┤                   │
//! │                                        │ EdgeSink::on_edge │
//! │   PulseCounter (AtomicI32) ◄───────────┘                   │
//! └────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod driver_registry;
pub mod drivers;

pub use crate::driver_registry::DriverRegistry;
