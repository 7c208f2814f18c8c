//! Top-level CLI definition and dispatch.

use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing::info;

use crate::core::config::{Config, Overrides};
use crate::core::errors::Result;
use crate::daemon::loop_main::{ChannelPacer, LoopExit, Watchdog};
use crate::daemon::preflight::{self, Preflight};
use crate::daemon::shutdown::{CommandShutdown, DryRunShutdown, ShutdownAction};
use crate::daemon::signals;
use crate::logger::{self, LOG_TARGET};
use crate::probe::locate::resolve_from_env;
use crate::probe::{PingProber, Prober};

/// Power-loss watchdog: shuts the machine down when the UPS-backed
/// reference host stops answering pings.
#[derive(Debug, Parser)]
#[command(name = "plw", version, about)]
pub struct Cli {
    /// Configuration file (default: /etc/power-watchdog/config.toml if present).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Host to probe.
    #[arg(long, global = true, value_name = "HOST")]
    pub target: Option<String>,

    /// Seconds between probes.
    #[arg(long, global = true, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Consecutive failures tolerated before shutting down.
    #[arg(long, global = true, value_name = "N")]
    pub threshold: Option<u32>,

    /// Log the shutdown instead of executing it.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Defaults to `watch`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch the target and shut down on sustained failure (default).
    Watch,
    /// Probe once and print the verdict; exits 1 when power looks off.
    Probe {
        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
    /// Generate a shell completion script.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            target: self.target.clone(),
            poll_interval_secs: self.interval,
            failure_threshold: self.threshold,
            dry_run: self.dry_run,
            verbose: self.verbose,
        }
    }

    /// Load, override and validate the configuration.
    pub fn effective_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        config.apply_overrides(&self.overrides());
        config.validate()?;
        Ok(config)
    }
}

/// Dispatch CLI commands.
///
/// # Errors
/// Returns an error if configuration, startup checks or the shutdown
/// command fail.
pub fn run(cli: &Cli) -> Result<ExitCode> {
    match cli.command.as_ref().unwrap_or(&Command::Watch) {
        Command::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "plw", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            let config = cli.effective_config()?;
            print!("{}", config.to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Probe { json } => probe_once(&cli.effective_config()?, *json),
        Command::Watch => watch(&cli.effective_config()?),
    }
}

fn probe_once(config: &Config, json: bool) -> Result<ExitCode> {
    let program = resolve_from_env(&config.probe.program)?;
    let mut prober = PingProber::from_config(&config.probe).with_program(program);
    let outcome = prober.probe()?;

    let mut stdout = io::stdout().lock();
    // A closed stdout is not worth failing the probe over.
    let _ = if json {
        writeln!(stdout, "{}", serde_json::to_string(&outcome)?)
    } else {
        writeln!(stdout, "{}: {outcome}", prober.target())
    };

    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn watch(config: &Config) -> Result<ExitCode> {
    logger::init(&config.logging)?;
    let path_var = std::env::var_os("PATH");
    let Preflight {
        probe_program,
        shutdown_program,
    } = preflight::check(config, path_var.as_deref(), preflight::running_as_root())?;

    let command = CommandShutdown::from_config(&config.shutdown);
    let shutdown: Box<dyn ShutdownAction> = match shutdown_program {
        Some(program) => Box::new(command.with_program(program)),
        None => Box::new(DryRunShutdown::new(&command)),
    };
    let prober = PingProber::from_config(&config.probe).with_program(probe_program);
    let pacer = ChannelPacer::new(signals::stop_channel()?);

    info!(
        target: LOG_TARGET,
        target_host = %config.probe.target,
        interval_secs = config.monitor.poll_interval_secs,
        threshold = config.monitor.failure_threshold,
        dry_run = config.shutdown.dry_run,
        "Shutdown Emergency - Environment power PING test started"
    );

    let mut watchdog = Watchdog::new(prober, shutdown, pacer, &config.monitor);
    match watchdog.run()? {
        LoopExit::ShutdownIssued { failures } => {
            info!(
                target: LOG_TARGET,
                failures, "Shutdown issued, watchdog exiting"
            );
        }
        LoopExit::Stopped { .. } | LoopExit::Halted => {}
    }
    Ok(ExitCode::SUCCESS)
}
