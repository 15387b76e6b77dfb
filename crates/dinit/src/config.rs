//! Command line flags and the configuration derived from them.
//!
//! Only the tokens before the first `-r` reach this parser; everything from
//! `-r` on is handled by the command codec.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::shutdown::{SETTLE_WINDOW, ShutdownPolicy};
use crate::socket::DEFAULT_SOCKET_PATH;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "dinit",
    version,
    about = "Start CMDs by passing the environment.\nDistribute SIGHUP, SIGTERM and SIGINT to the processes.",
    override_usage = "dinit [OPTION]... -r CMD [ARG]... [-r CMD [ARG]...]..."
)]
pub struct Cli {
    /// Seconds between SIGTERM/SIGINT and SIGKILL.
    #[arg(long, env = "DINIT_TIMEOUT", default_value_t = 10)]
    pub timeout: u64,

    /// Scale tokio worker threads to available CPUs * FRACTION
    /// (TOKIO_WORKER_THREADS wins when set).
    #[arg(
        long = "core-fraction",
        visible_alias = "maxproc",
        env = "DINIT_CORE_FRACTION",
        default_value_t = 0.0
    )]
    pub core_fraction: f64,

    /// Command to run during startup; a non-zero exit status aborts dinit.
    #[arg(long, env = "DINIT_START")]
    pub start: Option<String>,

    /// Command to run during teardown.
    #[arg(long, env = "DINIT_STOP")]
    pub stop: Option<String>,

    /// Write -r CMD... to the unix socket of a running dinit and exit.
    #[arg(long)]
    pub submit: bool,

    /// All processes are primary.
    #[arg(long, env = "DINIT_PRIMARY")]
    pub primary: bool,

    /// Path of the control socket.
    #[arg(long, env = "DINIT_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    pub socket: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long, env = "DINIT_VERBOSE")]
    pub verbose: bool,

    /// Omit timestamps from log lines.
    #[arg(long, env = "DINIT_NO_TIMESTAMPS")]
    pub no_timestamps: bool,
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub shutdown: ShutdownPolicy,
    pub core_fraction: f64,
    pub start: Option<String>,
    pub stop: Option<String>,
    pub submit: bool,
    pub all_primary: bool,
    pub socket_path: PathBuf,
    pub verbose: bool,
    pub timestamps: bool,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            shutdown: ShutdownPolicy {
                settle: SETTLE_WINDOW,
                grace: Duration::from_secs(cli.timeout),
            },
            core_fraction: cli.core_fraction,
            start: cli.start.filter(|s| !s.trim().is_empty()),
            stop: cli.stop.filter(|s| !s.trim().is_empty()),
            submit: cli.submit,
            all_primary: cli.primary,
            socket_path: cli.socket,
            verbose: cli.verbose,
            timestamps: !cli.no_timestamps,
        }
    }
}

/// Worker thread count for `fraction` of `cpus`, or `None` to keep the
/// runtime default.
pub fn scaled_worker_threads(fraction: f64, cpus: usize) -> Option<usize> {
    if fraction.is_nan() || fraction <= 0.0 {
        return None;
    }
    let threads = (cpus as f64 * fraction).ceil() as usize;
    Some(threads.max(1))
}
