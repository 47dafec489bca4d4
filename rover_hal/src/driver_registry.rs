//! Named HAL driver constructors.
//!
//! The firmware selects its driver by the `[hal] driver` name or the
//! `--driver` flag. A `DriverRegistry` is built once at startup and passed
//! to whoever needs it; there is no global table.

use rover_common::hal::driver::{DriverFactory, HalDriver, HalError};
use std::collections::BTreeMap;
use tracing::{debug, warn};

struct Entry {
    summary: &'static str,
    factory: DriverFactory,
}

/// Driver name → constructor, iterated in name order.
#[derive(Default)]
pub struct DriverRegistry {
    entries: BTreeMap<&'static str, Entry>,
}

impl DriverRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every driver compiled into this crate.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry);
        registry
    }

    /// Add a driver under `name`.
    ///
    /// # Errors
    /// `HalError::ConfigError` if `name` is taken. The earlier entry wins.
    pub fn register(
        &mut self,
        name: &'static str,
        summary: &'static str,
        factory: DriverFactory,
    ) -> Result<(), HalError> {
        if self.entries.contains_key(name) {
            return Err(HalError::ConfigError(format!(
                "driver '{name}' is already registered"
            )));
        }
        self.entries.insert(name, Entry { summary, factory });
        Ok(())
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Construct the driver registered as `name`. The driver still needs
    /// `init` before its first cycle.
    ///
    /// # Errors
    /// `HalError::DriverNotFound` carrying the requested name.
    pub fn create_driver(&self, name: &str) -> Result<Box<dyn HalDriver>, HalError> {
        let Some(entry) = self.entries.get(name) else {
            warn!(requested = name, available = ?self.names(), "unknown HAL driver");
            return Err(HalError::DriverNotFound(name.to_string()));
        };
        debug!(driver = name, "creating HAL driver");
        Ok((entry.factory)())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    /// `(name, summary)` pairs, sorted by name.
    pub fn drivers(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.entries.iter().map(|(name, e)| (*name, e.summary))
    }
}
