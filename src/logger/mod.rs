//! Structured stdout logging via `tracing`.
//!
//! Every event is emitted under the fixed target [`LOG_TARGET`], so a line
//! reads `<timestamp> <LEVEL> shutdown_emergency: <message>`. `tracing` has
//! no level above `ERROR`; the [`critical!`](crate::critical) macro marks such
//! events with `severity = "critical"`, which the text format prints as the
//! level `CRITICAL`. JSON lines keep `"level":"ERROR"` next to the field.

use std::fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::time::{ChronoLocal, FormatTime};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

use crate::core::config::{LogFormat, LoggingConfig};
use crate::core::errors::{Result, WatchdogError};

/// Logger name carried by every line.
pub const LOG_TARGET: &str = "shutdown_emergency";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Log at the highest severity.
#[macro_export]
macro_rules! critical {
    ($($arg:tt)+) => {
        ::tracing::error!(target: $crate::logger::LOG_TARGET, severity = "critical", $($arg)+)
    };
}

/// Plain-text event format that knows about the `critical` severity.
pub struct SeverityText<T> {
    timer: T,
}

impl<T: FormatTime> SeverityText<T> {
    /// Format lines with `timer` at the front.
    #[must_use]
    pub const fn new(timer: T) -> Self {
        Self { timer }
    }
}

impl<S, N, T> FormatEvent<S, N> for SeverityText<T>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    T: FormatTime,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        self.timer.format_time(&mut writer)?;
        write!(
            writer,
            " {:>5} {}: ",
            level_label(event),
            event.metadata().target()
        )?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn level_label(event: &Event<'_>) -> &'static str {
    let mut severity = SeverityField::default();
    event.record(&mut severity);
    if severity.critical {
        return "CRITICAL";
    }
    match *event.metadata().level() {
        Level::TRACE => "TRACE",
        Level::DEBUG => "DEBUG",
        Level::INFO => "INFO",
        Level::WARN => "WARN",
        Level::ERROR => "ERROR",
    }
}

#[derive(Default)]
struct SeverityField {
    critical: bool,
}

impl Visit for SeverityField {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "severity" && value == "critical" {
            self.critical = true;
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn fmt::Debug) {}
}

fn timer() -> ChronoLocal {
    ChronoLocal::new(TIMESTAMP_FORMAT.to_string())
}

/// Build the level filter: `RUST_LOG` when set and valid, else the
/// configured level.
pub fn build_filter(configured: &str, rust_log: Option<&str>) -> Result<EnvFilter> {
    if let Some(directives) = rust_log.filter(|raw| !raw.trim().is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return Ok(filter);
        }
    }
    EnvFilter::try_new(configured).map_err(|e| {
        WatchdogError::invalid_config(format!("logging.level {configured:?}: {e}"))
    })
}

/// Install the global subscriber. Call once, before the first event.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter(&config.level, rust_log.as_deref())?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout);

    let installed = match config.format {
        LogFormat::Text => builder.event_format(SeverityText::new(timer())).try_init(),
        LogFormat::Json => builder
            .json()
            .with_timer(timer())
            .with_target(true)
            .try_init(),
    };
    installed.map_err(|e| WatchdogError::Runtime {
        details: format!("logger already initialised: {e}"),
    })
}
