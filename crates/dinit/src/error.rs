//! Supervisor error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;

/// Errors that can occur while supervising processes.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The executable could not be started.
    #[error("process failed to start: {argv:?}: {source}")]
    Spawn {
        argv: Vec<String>,
        #[source]
        source: io::Error,
    },

    /// The process started but reported no pid.
    #[error("process started without a pid: {argv:?}")]
    MissingPid { argv: Vec<String> },

    /// The control socket could not be bound.
    #[error("socket: listen error on {path:?}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A signal stream could not be installed.
    #[error("failed to install signal handler: {0}")]
    SignalHandler(#[source] io::Error),

    /// A start or stop hook failed.
    #[error("hook {command:?} failed: {reason}")]
    Hook { command: String, reason: String },
}
