//! Zombie reaping for when dinit runs as PID 1.
//!
//! Orphans anywhere in the container are re-parented to PID 1 and must be
//! collected by it. Children the supervisor started itself are left to their
//! watcher so their exit can still be classified.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error};
use rustix::process::{WaitOptions, waitpid};
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;

use crate::error::{SupervisorError, SupervisorResult};
use crate::events::{EventSink, SupervisorEvent};
use crate::registry::Registry;
use crate::signal::process_id;

/// Fallback reap interval when no SIGCHLD arrives.
const REAP_INTERVAL: Duration = Duration::from_secs(1);

/// Whether this process is the container's init.
pub fn is_init() -> bool {
    rustix::process::getpid() == rustix::process::Pid::INIT
}

pub struct Reaper {
    registry: Arc<Registry>,
    events: Arc<dyn EventSink>,
}

impl Reaper {
    pub fn new(registry: Arc<Registry>, events: Arc<dyn EventSink>) -> Self {
        Self { registry, events }
    }

    /// Run the reaper in the background until the handle is stopped.
    pub fn spawn(self) -> ReaperHandle {
        let task = tokio::spawn(async move {
            if let Err(e) = self.run().await {
                error!("reaper stopped: {e}");
            }
        });
        ReaperHandle { task }
    }

    /// Reap on every SIGCHLD and on a fallback tick, forever.
    pub async fn run(self) -> SupervisorResult<()> {
        let mut sigchld = signal(SignalKind::child()).map_err(SupervisorError::SignalHandler)?;
        let mut tick = tokio::time::interval(REAP_INTERVAL);

        loop {
            tokio::select! {
                _ = sigchld.recv() => {}
                _ = tick.tick() => {}
            }
            self.reap_ready().await;
        }
    }

    /// Reap every waitable child that is not a registered process.
    ///
    /// Stops at the first registered child: its watcher collects it, and the
    /// next round picks up whatever is queued behind it. Children still
    /// being started are waited out first.
    pub async fn reap_ready(&self) -> usize {
        let _gate = self.registry.reap_gate().await;
        let mut reaped = 0;
        while let Some(pid) = peek_waitable() {
            if self.registry.contains(pid).await || !reap(pid) {
                break;
            }
            self.events.emit(SupervisorEvent::Reaped { pid });
            reaped += 1;
        }
        reaped
    }
}

/// A running reaper task.
pub struct ReaperHandle {
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Stop reaping and wait for the current round to end.
    ///
    /// Children spawned afterwards (the stop hook) keep their exit status.
    pub async fn stop(self) {
        self.task.abort();
        if let Err(e) = self.task.await
            && !e.is_cancelled()
        {
            debug!("reaper task ended abnormally: {e}");
        }
    }
}

/// Pid of a child that has exited, without collecting it.
///
/// rustix's `waitid` does not expose `si_pid`, so this goes through libc.
fn peek_waitable() -> Option<u32> {
    // SAFETY: an all-zero siginfo_t is a valid out-parameter for waitid(2).
    let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
    // SAFETY: `info` is a live, writable siginfo_t for the duration of the call.
    let rc = unsafe {
        libc::waitid(
            libc::P_ALL,
            0,
            &mut info,
            libc::WEXITED | libc::WNOHANG | libc::WNOWAIT,
        )
    };
    if rc != 0 {
        return None;
    }
    // SAFETY: waitid succeeded, so si_pid is initialised (0 when nothing is ready).
    let pid = unsafe { info.si_pid() };
    u32::try_from(pid).ok().filter(|pid| *pid > 0)
}

/// Collect the exited child `pid`.
fn reap(pid: u32) -> bool {
    let Some(pid) = process_id(pid) else {
        return false;
    };
    matches!(waitpid(Some(pid), WaitOptions::NOHANG), Ok(Some(_)))
}
