//! SIGINT/SIGTERM forwarding for a clean stop between ticks.

use std::thread;

use crossbeam_channel::Receiver;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use crate::core::errors::{Result, WatchdogError};

/// Register handlers and return a channel that yields each stop signal.
///
/// The listener thread only forwards signal numbers; it never touches
/// watchdog state.
pub fn stop_channel() -> Result<Receiver<i32>> {
    let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(|e| WatchdogError::Signal {
        details: e.to_string(),
    })?;
    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::Builder::new()
        .name("plw-signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                match tx.try_send(signal) {
                    Ok(()) | Err(crossbeam_channel::TrySendError::Full(_)) => {}
                    Err(crossbeam_channel::TrySendError::Disconnected(_)) => break,
                }
            }
        })
        .map_err(|e| WatchdogError::Signal {
            details: format!("failed to start signal listener: {e}"),
        })?;
    Ok(rx)
}
