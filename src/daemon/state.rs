//! Debounce state machine: consecutive probe failures in, one shutdown
//! decision out.
//!
//! ```text
//!            power on: failures = 0
//!            power off: failures += 1 (while failures <= threshold)
//!           ┌──────┐
//!           ▼      │
//!       Watching ──┘ ── failures > threshold ──▶ ShuttingDown (terminal)
//! ```

#![allow(missing_docs)]

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Watching,
    ShuttingDown,
}

/// What one observation did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Power on; counter back to zero.
    Reset { previous: u32 },
    /// Power off, still under the threshold.
    Incremented { failures: u32 },
    /// Power off and the threshold is now exceeded. Emitted exactly once.
    TriggerShutdown { failures: u32 },
    /// Observation after the terminal state; ignored.
    Halted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorState {
    threshold: u32,
    consecutive_failures: u32,
    phase: Phase,
}

impl MonitorState {
    #[must_use]
    pub const fn new(threshold: u32) -> Self {
        Self {
            threshold,
            consecutive_failures: 0,
            phase: Phase::Watching,
        }
    }

    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Feed one tick's verdict (`true` = power on).
    pub fn observe(&mut self, power_on: bool) -> Transition {
        if self.phase == Phase::ShuttingDown {
            return Transition::Halted;
        }
        if power_on {
            let previous = self.consecutive_failures;
            self.consecutive_failures = 0;
            return Transition::Reset { previous };
        }
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures > self.threshold {
            self.phase = Phase::ShuttingDown;
            Transition::TriggerShutdown {
                failures: self.consecutive_failures,
            }
        } else {
            Transition::Incremented {
                failures: self.consecutive_failures,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_watching_with_zero_failures() {
        let state = MonitorState::new(6);
        assert_eq!(state.phase(), Phase::Watching);
        assert_eq!(state.consecutive_failures(), 0);
    }

    #[test]
    fn success_resets_from_any_count() {
        let mut state = MonitorState::new(6);
        for _ in 0..4 {
            state.observe(false);
        }
        assert_eq!(state.observe(true), Transition::Reset { previous: 4 });
        assert_eq!(state.consecutive_failures(), 0);
        assert_eq!(state.observe(true), Transition::Reset { previous: 0 });
    }

    #[test]
    fn seventh_failure_triggers_at_threshold_six() {
        let mut state = MonitorState::new(6);
        for expected in 1..=6 {
            assert_eq!(
                state.observe(false),
                Transition::Incremented { failures: expected }
            );
            assert_eq!(state.phase(), Phase::Watching);
        }
        assert_eq!(
            state.observe(false),
            Transition::TriggerShutdown { failures: 7 }
        );
        assert_eq!(state.phase(), Phase::ShuttingDown);
    }

    #[test]
    fn five_failures_then_success_never_triggers() {
        let mut state = MonitorState::new(6);
        let counts: Vec<u32> = [false, false, false, false, false, true]
            .into_iter()
            .map(|power_on| {
                state.observe(power_on);
                state.consecutive_failures()
            })
            .collect();
        assert_eq!(counts, [1, 2, 3, 4, 5, 0]);
        assert_eq!(state.phase(), Phase::Watching);
    }

    #[test]
    fn shutting_down_is_terminal_and_triggers_once() {
        let mut state = MonitorState::new(0);
        assert_eq!(
            state.observe(false),
            Transition::TriggerShutdown { failures: 1 }
        );
        assert_eq!(state.observe(false), Transition::Halted);
        assert_eq!(state.observe(true), Transition::Halted);
        assert_eq!(state.phase(), Phase::ShuttingDown);
        assert_eq!(state.consecutive_failures(), 1);
    }

    #[test]
    fn interrupted_runs_need_a_full_streak() {
        let mut state = MonitorState::new(2);
        let pattern = [false, false, true, false, false, true, false, false];
        for power_on in pattern {
            let transition = state.observe(power_on);
            assert!(
                !matches!(transition, Transition::TriggerShutdown { .. }),
                "unexpected {transition:?}"
            );
        }
        assert!(matches!(
            state.observe(false),
            Transition::TriggerShutdown { failures: 3 }
        ));
    }
}
