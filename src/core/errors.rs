//! PLW-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, WatchdogError>;

/// Top-level error type for the power watchdog.
#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error("[PLW-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[PLW-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[PLW-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[PLW-1101] executable not found: {program}")]
    MissingExecutable { program: PathBuf },

    #[error("[PLW-1102] insufficient privilege: {details}")]
    InsufficientPrivilege { details: String },

    #[error("[PLW-2001] failed to spawn probe {program}: {source}")]
    ProbeSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[PLW-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[PLW-3001] shutdown command failed: {details}")]
    ShutdownCommand { details: String },

    #[error("[PLW-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[PLW-3003] signal handler setup failed: {details}")]
    Signal { details: String },

    #[error("[PLW-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl WatchdogError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "PLW-1001",
            Self::MissingConfig { .. } => "PLW-1002",
            Self::ConfigParse { .. } => "PLW-1003",
            Self::MissingExecutable { .. } => "PLW-1101",
            Self::InsufficientPrivilege { .. } => "PLW-1102",
            Self::ProbeSpawn { .. } => "PLW-2001",
            Self::Serialization { .. } => "PLW-2101",
            Self::ShutdownCommand { .. } => "PLW-3001",
            Self::Io { .. } => "PLW-3002",
            Self::Signal { .. } => "PLW-3003",
            Self::Runtime { .. } => "PLW-3900",
        }
    }

    /// Whether the failure belongs to startup (configuration and environment
    /// checks) rather than to a running watch.
    #[must_use]
    pub const fn is_startup(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
                | Self::MissingExecutable { .. }
                | Self::InsufficientPrivilege { .. }
                | Self::Signal { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for configuration validation failures.
    #[must_use]
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig {
            details: details.into(),
        }
    }
}

impl From<serde_json::Error> for WatchdogError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for WatchdogError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for WatchdogError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}
