//! Summary-line parsing for ping-style reachability utilities, and the
//! threshold policy that turns a summary into a power verdict.
//!
//! Accepted shape (iputils):
//!
//! ```text
//! 3 packets transmitted, 0 received, +2 errors, 100% packet loss, time 3012ms
//! ```
//!
//! The `+N duplicates`, `+N corrupted` and `+N errors` clauses are optional,
//! the loss may be fractional (`33.3333%`), and `time` may be missing when
//! the utility was interrupted.

#![allow(missing_docs)]

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^(?P<sent>\d+) packets transmitted, (?P<recv>\d+) received(?:, \+(?P<dup>\d+) duplicates?)?(?:, \+(?P<corrupt>\d+) corrupted)?(?:, \+(?P<errors>\d+) errors?)?, (?P<loss>\d+(?:\.\d+)?)% packet loss(?:, time (?P<time>\d+)ms)?\s*$",
    )
    .expect("summary pattern is valid")
});

/// Parsed statistics line of one probe run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PingSummary {
    pub transmitted: u32,
    pub received: u32,
    pub duplicates: u32,
    /// `None` when the utility omitted the errors clause.
    pub errors: Option<u32>,
    pub loss_pct: f64,
    pub time_ms: Option<u64>,
    /// The matched line, verbatim.
    pub line: String,
}

impl PingSummary {
    /// Locate and parse the summary line anywhere in `output`.
    #[must_use]
    pub fn parse(output: &str) -> Option<Self> {
        let caps = SUMMARY_RE.captures(output)?;
        let number = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<u32>().ok());
        Some(Self {
            transmitted: number("sent")?,
            received: number("recv")?,
            duplicates: number("dup").unwrap_or(0),
            errors: match caps.name("errors") {
                Some(m) => Some(m.as_str().parse().ok()?),
                None => None,
            },
            loss_pct: caps.name("loss")?.as_str().parse().ok()?,
            time_ms: caps.name("time").and_then(|m| m.as_str().parse().ok()),
            line: caps.get(0)?.as_str().trim_end().to_string(),
        })
    }

    /// Error count, treating an absent clause as zero.
    #[must_use]
    pub fn error_count(&self) -> u32 {
        self.errors.unwrap_or(0)
    }
}

impl fmt::Display for PingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

/// Thresholds above which a probe summary means "power is off".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerPolicy {
    pub max_errors: u32,
    pub max_loss_pct: f64,
}

impl Default for PowerPolicy {
    fn default() -> Self {
        Self {
            max_errors: 1,
            max_loss_pct: 50.0,
        }
    }
}

impl PowerPolicy {
    /// `true` means power is presumed on.
    #[must_use]
    pub fn classify(&self, summary: &PingSummary) -> bool {
        summary.error_count() <= self.max_errors && summary.loss_pct <= self.max_loss_pct
    }
}
