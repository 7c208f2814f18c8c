//! Watchdog configuration: TOML file model, environment overrides, validation.
//!
//! Precedence, lowest first: compiled defaults, the TOML file, `PLW_*`
//! environment variables, then CLI flags (applied by the caller through
//! [`Overrides`]). The resulting [`Config`] is immutable for the rest of the
//! process.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, WatchdogError};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/power-watchdog/config.toml";

const DEFAULT_TARGET: &str = "192.168.200.32";
const DEFAULT_SHUTDOWN_MESSAGE: &str =
    "Server is going down for environment power off. Please save your work ASAP.";
const MAX_SHUTDOWN_DELAY_MINUTES: u32 = 60;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub probe: ProbeConfig,
    pub monitor: MonitorConfig,
    pub shutdown: ShutdownConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Host whose reachability stands in for "mains power is on".
    pub target: String,
    /// Reachability utility; must accept `-c <count> -w <deadline> <target>`.
    pub program: PathBuf,
    pub packet_count: u32,
    /// Deadline handed to the utility itself.
    pub deadline_secs: u64,
    /// Hard bound on the whole invocation; the child is killed past it.
    pub guard_timeout_secs: u64,
    /// Error counts strictly above this classify as power-off.
    pub max_errors: u32,
    /// Loss percentages strictly above this classify as power-off.
    pub max_loss_pct: f64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            program: PathBuf::from("ping"),
            packet_count: 3,
            deadline_secs: 8,
            guard_timeout_secs: 10,
            max_errors: 1,
            max_loss_pct: 50.0,
        }
    }
}

impl ProbeConfig {
    #[must_use]
    pub const fn guard_timeout(&self) -> Duration {
        Duration::from_secs(self.guard_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    pub poll_interval_secs: u64,
    /// Shutdown fires once consecutive failures strictly exceed this.
    pub failure_threshold: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            failure_threshold: 6,
        }
    }
}

impl MonitorConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShutdownConfig {
    pub program: PathBuf,
    /// Grace delay in minutes; 0 means `now`.
    pub delay_minutes: u32,
    /// Broadcast to logged-in users.
    pub message: String,
    /// Log the shutdown instead of running it.
    pub dry_run: bool,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("shutdown"),
            delay_minutes: 1,
            message: DEFAULT_SHUTDOWN_MESSAGE.to_string(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Command-line overrides, applied last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub target: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub failure_threshold: Option<u32>,
    pub dry_run: bool,
    pub verbose: bool,
}

impl Config {
    /// Load the effective configuration.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_PATH`] is
    /// read when present and compiled defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(WatchdogError::MissingConfig {
                        path: explicit.to_path_buf(),
                    });
                }
                Self::from_file(explicit)?
            }
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| WatchdogError::io(path, source))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply `PLW_*` variables through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(target) = lookup("PLW_TARGET") {
            self.probe.target = target;
        }
        if let Some(raw) = lookup("PLW_POLL_INTERVAL_SECS") {
            self.monitor.poll_interval_secs = parse_env("PLW_POLL_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("PLW_FAILURE_THRESHOLD") {
            self.monitor.failure_threshold = parse_env("PLW_FAILURE_THRESHOLD", &raw)?;
        }
        if let Some(raw) = lookup("PLW_DRY_RUN") {
            self.shutdown.dry_run = parse_bool("PLW_DRY_RUN", &raw)?;
        }
        if let Some(level) = lookup("PLW_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(target) = &overrides.target {
            self.probe.target.clone_from(target);
        }
        if let Some(secs) = overrides.poll_interval_secs {
            self.monitor.poll_interval_secs = secs;
        }
        if let Some(threshold) = overrides.failure_threshold {
            self.monitor.failure_threshold = threshold;
        }
        if overrides.dry_run {
            self.shutdown.dry_run = true;
        }
        if overrides.verbose {
            self.logging.level = "debug".to_string();
        }
    }

    /// Reject configurations the watchdog cannot run safely with.
    pub fn validate(&self) -> Result<()> {
        let probe = &self.probe;
        let target = probe.target.trim();
        if target.is_empty() {
            return Err(WatchdogError::invalid_config("probe.target must not be empty"));
        }
        // The target lands in argv of the probe utility.
        if target.starts_with('-') || target.chars().any(char::is_whitespace) {
            return Err(WatchdogError::invalid_config(format!(
                "probe.target {target:?} is not a host name or address"
            )));
        }
        if probe.packet_count == 0 {
            return Err(WatchdogError::invalid_config("probe.packet_count must be at least 1"));
        }
        if probe.deadline_secs == 0 {
            return Err(WatchdogError::invalid_config("probe.deadline_secs must be at least 1"));
        }
        if probe.guard_timeout_secs < probe.deadline_secs {
            return Err(WatchdogError::invalid_config(format!(
                "probe.guard_timeout_secs ({}) must not be shorter than probe.deadline_secs ({})",
                probe.guard_timeout_secs, probe.deadline_secs
            )));
        }
        if !(0.0..=100.0).contains(&probe.max_loss_pct) {
            return Err(WatchdogError::invalid_config(format!(
                "probe.max_loss_pct must be within 0..=100, got {}",
                probe.max_loss_pct
            )));
        }
        if self.monitor.poll_interval_secs == 0 {
            return Err(WatchdogError::invalid_config(
                "monitor.poll_interval_secs must be at least 1",
            ));
        }
        if self.shutdown.delay_minutes > MAX_SHUTDOWN_DELAY_MINUTES {
            return Err(WatchdogError::invalid_config(format!(
                "shutdown.delay_minutes must be at most {MAX_SHUTDOWN_DELAY_MINUTES}"
            )));
        }
        if self.shutdown.message.trim().is_empty() {
            return Err(WatchdogError::invalid_config("shutdown.message must not be empty"));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(WatchdogError::invalid_config(format!(
                "logging.level {:?} is not one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| WatchdogError::ConfigParse {
        context: "environment",
        details: format!("{key}={raw:?} is not a valid number"),
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(WatchdogError::ConfigParse {
            context: "environment",
            details: format!("{key}={raw:?} is not a boolean"),
        }),
    }
}
