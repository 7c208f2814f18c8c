//! Result of one probe invocation.

#![allow(missing_docs)]

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::summary::{PingSummary, PowerPolicy};

/// Longest raw-output excerpt kept for diagnostics.
const RAW_EXCERPT_LIMIT: usize = 512;

/// What the probe run produced, beyond the verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// A summary line was found and classified.
    Summary(PingSummary),
    /// The process finished but printed no usable summary.
    Unparsable {
        raw: String,
        /// `None` when killed by a signal or when classifying bare text.
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },
    /// The process outlived the guard timeout and was killed.
    TimedOut { raw: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeOutcome {
    /// Power presumed on.
    pub success: bool,
    pub finding: Finding,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    pub observed_at: DateTime<Utc>,
}

impl ProbeOutcome {
    /// Classify raw probe stdout. Anything without a summary line is
    /// treated as power-off.
    #[must_use]
    pub fn parse(raw: &[u8], policy: &PowerPolicy) -> Self {
        let text = String::from_utf8_lossy(raw);
        match PingSummary::parse(&text) {
            Some(summary) => Self {
                success: policy.classify(&summary),
                finding: Finding::Summary(summary),
                elapsed: Duration::ZERO,
                observed_at: Utc::now(),
            },
            None => Self {
                success: false,
                finding: Finding::Unparsable {
                    raw: excerpt(&text),
                    exit_code: None,
                },
                elapsed: Duration::ZERO,
                observed_at: Utc::now(),
            },
        }
    }

    /// Outcome for a probe that had to be killed.
    #[must_use]
    pub fn timed_out(raw: &[u8]) -> Self {
        Self {
            success: false,
            finding: Finding::TimedOut {
                raw: excerpt(&String::from_utf8_lossy(raw)),
            },
            elapsed: Duration::ZERO,
            observed_at: Utc::now(),
        }
    }

    /// Attach the probe's exit code to an unparsable finding.
    #[must_use]
    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        if let Finding::Unparsable { exit_code, .. } = &mut self.finding {
            *exit_code = code;
        }
        self
    }

    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    #[must_use]
    pub fn summary(&self) -> Option<&PingSummary> {
        match &self.finding {
            Finding::Summary(summary) => Some(summary),
            Finding::Unparsable { .. } | Finding::TimedOut { .. } => None,
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.success { "power on" } else { "power off" };
        match &self.finding {
            Finding::Summary(summary) => write!(f, "{verdict}: {summary}"),
            Finding::Unparsable {
                raw,
                exit_code: Some(code),
            } => write!(f, "{verdict}: unrecognised output {raw:?}, exit code {code}"),
            Finding::Unparsable { raw, .. } => write!(f, "{verdict}: unrecognised output {raw:?}"),
            Finding::TimedOut { raw } => {
                write!(f, "{verdict}: probe killed after {:?}, output {raw:?}", self.elapsed)
            }
        }
    }
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= RAW_EXCERPT_LIMIT {
        return trimmed.to_string();
    }
    let mut end = RAW_EXCERPT_LIMIT;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    #[allow(clippy::trivially_copy_pass_by_ref)] // serde `with` signature
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_classifies_summary() {
        let outcome = ProbeOutcome::parse(
            b"3 packets transmitted, 3 received, 0% packet loss, time 12ms\n",
            &PowerPolicy::default(),
        );
        assert!(outcome.success);
        assert_eq!(outcome.summary().map(|s| s.received), Some(3));
    }

    #[test]
    fn garbage_is_power_off_with_raw_kept() {
        let outcome = ProbeOutcome::parse(b"Segmentation fault\n", &PowerPolicy::default());
        assert!(!outcome.success);
        assert_eq!(
            outcome.finding,
            Finding::Unparsable {
                raw: "Segmentation fault".to_string(),
                exit_code: None,
            }
        );
    }

    #[test]
    fn exit_code_is_kept_only_for_unparsable_output() {
        let outcome = ProbeOutcome::parse(b"ping: unknown host", &PowerPolicy::default())
            .with_exit_code(Some(2));
        assert!(outcome.to_string().ends_with("exit code 2"));
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json["finding"]["exit_code"], 2);

        let healthy = ProbeOutcome::parse(
            b"3 packets transmitted, 3 received, 0% packet loss, time 12ms",
            &PowerPolicy::default(),
        )
        .with_exit_code(Some(0));
        assert!(matches!(healthy.finding, Finding::Summary(_)));
    }

    #[test]
    fn empty_output_is_power_off() {
        let outcome = ProbeOutcome::parse(b"", &PowerPolicy::default());
        assert!(!outcome.success);
        assert!(outcome.summary().is_none());
    }

    #[test]
    fn invalid_utf8_does_not_panic() {
        let outcome = ProbeOutcome::parse(&[0xff, 0xfe, b'\n'], &PowerPolicy::default());
        assert!(!outcome.success);
    }

    #[test]
    fn long_raw_output_is_truncated() {
        let raw = "x".repeat(RAW_EXCERPT_LIMIT * 2);
        let outcome = ProbeOutcome::parse(raw.as_bytes(), &PowerPolicy::default());
        match outcome.finding {
            Finding::Unparsable { raw, .. } => {
                assert_eq!(raw.len(), RAW_EXCERPT_LIMIT + 3);
                assert!(raw.ends_with("..."));
            }
            other => panic!("unexpected finding {other:?}"),
        }
    }

    #[test]
    fn timed_out_is_power_off() {
        let outcome = ProbeOutcome::timed_out(b"PING 10.0.0.1").with_elapsed(Duration::from_secs(10));
        assert!(!outcome.success);
        assert!(outcome.to_string().contains("killed after 10s"));
    }

    #[test]
    fn serializes_with_kind_tag() {
        let outcome = ProbeOutcome::parse(
            b"3 packets transmitted, 0 received, +2 errors, 100% packet loss, time 3012ms",
            &PowerPolicy::default(),
        )
        .with_elapsed(Duration::from_millis(3015));
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json["success"], false);
        assert_eq!(json["finding"]["kind"], "summary");
        assert_eq!(json["finding"]["errors"], 2);
        assert_eq!(json["elapsed"], 3015);
        assert!(json["observed_at"].as_str().is_some_and(|ts| ts.ends_with('Z')));
    }
}
