//! Daemon subsystem: debounce state machine, main watch loop, shutdown
//! action, startup checks, signal handling.

pub mod loop_main;
pub mod preflight;
pub mod shutdown;
#[cfg(feature = "daemon")]
pub mod signals;
pub mod state;
