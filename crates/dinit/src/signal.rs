//! Signals the supervisor sends and reports.

use std::fmt;
use std::io;

use rustix::process::{Pid, kill_process};

/// Signals sent to supervised processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Hangup,
    Interrupt,
    Terminate,
    Kill,
}

impl Signal {
    pub fn as_raw(self) -> libc::c_int {
        match self {
            Signal::Hangup => libc::SIGHUP,
            Signal::Interrupt => libc::SIGINT,
            Signal::Terminate => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Signal::Hangup => "SIGHUP",
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Kill => "SIGKILL",
        }
    }
}

impl From<Signal> for rustix::process::Signal {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Hangup => Self::HUP,
            Signal::Interrupt => Self::INT,
            Signal::Terminate => Self::TERM,
            Signal::Kill => Self::KILL,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Deliver `signal` to `pid`.
///
/// The target may already have exited; callers treat an error as
/// "nothing to do" rather than a failure.
pub fn send(pid: u32, signal: Signal) -> io::Result<()> {
    // Pid 0 would address our own process group.
    let pid = process_id(pid).ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;
    kill_process(pid, signal.into())?;
    Ok(())
}

/// A single, positive process id.
pub(crate) fn process_id(pid: u32) -> Option<Pid> {
    i32::try_from(pid).ok().and_then(Pid::from_raw)
}

/// Human-readable description of a terminating signal number.
pub fn describe(raw: i32) -> String {
    let name = match raw {
        libc::SIGHUP => "hangup",
        libc::SIGINT => "interrupt",
        libc::SIGQUIT => "quit",
        libc::SIGABRT => "aborted",
        libc::SIGKILL => "killed",
        libc::SIGSEGV => "segmentation fault",
        libc::SIGPIPE => "broken pipe",
        libc::SIGTERM => "terminated",
        _ => return format!("signal {raw}"),
    };
    name.to_string()
}
