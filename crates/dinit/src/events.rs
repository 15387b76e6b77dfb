//! Lifecycle events and the sinks that report them.
//!
//! Every transition the supervisor makes is described by a
//! [`SupervisorEvent`]. Production code reports them through [`LogSink`];
//! tests inject a [`RecordingSink`] and assert on the collected events
//! instead of scraping log output.

use std::fmt;
use std::process::ExitStatus;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::signal::{self, Signal};

/// How a supervised process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitKind {
    /// Exited on its own. `None` when the status was collected elsewhere.
    Exited(Option<i32>),
    /// Terminated by a signal.
    Signaled(i32),
    /// Waiting on the process failed.
    Failed(String),
}

impl From<ExitStatus> for ExitKind {
    fn from(status: ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;

        match (status.code(), status.signal()) {
            (Some(code), _) => ExitKind::Exited(Some(code)),
            (None, Some(sig)) => ExitKind::Signaled(sig),
            (None, None) => ExitKind::Exited(None),
        }
    }
}

/// A supervisor lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    Started {
        pid: u32,
        argv: Vec<String>,
    },
    SpawnFailed {
        argv: Vec<String>,
        error: String,
    },
    Finished {
        pid: u32,
        argv: Vec<String>,
        exit: ExitKind,
    },
    PrimaryExited {
        pid: u32,
    },
    AllPrimaryExited {
        pid: u32,
    },
    SignalSent {
        pid: u32,
        signal: Signal,
    },
    Lingering {
        count: usize,
        grace: Duration,
    },
    Reaped {
        pid: u32,
    },
    Goodbye,
}

impl fmt::Display for SupervisorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorEvent::Started { pid, argv } => write!(f, "pid {pid} started: {argv:?}"),
            SupervisorEvent::SpawnFailed { argv, error } => {
                write!(f, "process failed to start: {argv:?}: {error}")
            }
            SupervisorEvent::Finished { pid, argv, exit } => match exit {
                ExitKind::Exited(None) | ExitKind::Exited(Some(0)) => {
                    write!(f, "pid {pid} finished: {argv:?}")
                }
                ExitKind::Exited(Some(code)) => {
                    write!(f, "pid {pid} finished: {argv:?} with error: exit status {code}")
                }
                ExitKind::Signaled(sig) => write!(
                    f,
                    "pid {pid} finished: {argv:?} with error: signal: {}",
                    signal::describe(*sig)
                ),
                ExitKind::Failed(error) => {
                    write!(f, "pid {pid} finished: {argv:?} with error: {error}")
                }
            },
            SupervisorEvent::PrimaryExited { pid } => {
                write!(f, "pid {pid} was primary, signalling other processes")
            }
            SupervisorEvent::AllPrimaryExited { .. } => {
                write!(f, "all processes considered primary, signalling other processes")
            }
            SupervisorEvent::SignalSent { pid, signal } => {
                write!(f, "signal {} sent to pid {pid}", signal.as_raw())
            }
            SupervisorEvent::Lingering { count, grace } => write!(
                f,
                "{count} processes still alive, sending SIGKILL in {}s",
                grace.as_secs_f64()
            ),
            SupervisorEvent::Reaped { pid } => write!(f, "pid {pid} reaped"),
            SupervisorEvent::Goodbye => write!(f, "all processes exited, goodbye!"),
        }
    }
}

/// Destination for supervisor events.
pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, event: SupervisorEvent);
}

/// Reports events through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: SupervisorEvent) {
        match &event {
            SupervisorEvent::SpawnFailed { .. } => error!("{event}"),
            SupervisorEvent::Finished {
                exit: ExitKind::Failed(_),
                ..
            }
            | SupervisorEvent::Lingering { .. } => warn!("{event}"),
            SupervisorEvent::Reaped { .. } => debug!("{event}"),
            _ => info!("{event}"),
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SupervisorEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event emitted so far, in order.
    pub fn events(&self) -> Vec<SupervisorEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rendered log lines, in order.
    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(ToString::to_string).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: SupervisorEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
