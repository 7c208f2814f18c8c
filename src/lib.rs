//! Power-loss watchdog.
//!
//! Pings a host that only stays up while mains power is present (typically
//! a router on the same UPS bus) and, once enough consecutive probes fail,
//! schedules a system power-off before the UPS runs dry.

pub mod core;
pub mod daemon;
pub mod logger;
pub mod probe;

#[cfg(feature = "cli")]
pub mod cli_app;

pub use crate::core::config::Config;
pub use crate::core::errors::{Result, WatchdogError};
