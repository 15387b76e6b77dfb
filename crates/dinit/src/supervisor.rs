//! Supervisor core: starts commands and watches them until they exit.
//!
//! Each command moves through `Pending -> Started -> Exited`. Starting a
//! command registers it and hands the child to a watcher task; the watcher
//! removes it from the registry once the exit is observed and, if the
//! process was primary, shuts down everything else.

use std::sync::Arc;

use dinit_protocol::{CommandGroup, CommandSpec};
use tokio::process::{Child, Command};

use crate::error::{SupervisorError, SupervisorResult};
use crate::events::{EventSink, ExitKind, SupervisorEvent};
use crate::primary::PrimarySet;
use crate::registry::{ProcessHandle, Registry};
use crate::shutdown::{ShutdownCoordinator, ShutdownPolicy};
use crate::signal::Signal;

/// Where a batch of commands came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The command line. A start failure aborts the batch and shuts down
    /// whatever already started; the last command is primary.
    Boot,
    /// The control socket. Failures are isolated and nothing is primary.
    Socket,
}

/// Start a command with inherited stdio.
pub fn spawn(spec: &CommandSpec) -> SupervisorResult<Child> {
    Command::new(spec.program())
        .args(spec.args())
        .spawn()
        .map_err(|source| SupervisorError::Spawn {
            argv: spec.argv().to_vec(),
            source,
        })
}

/// Shared handle to the supervisor state. Cloning is cheap.
#[derive(Clone)]
pub struct Supervisor {
    registry: Arc<Registry>,
    primaries: Arc<PrimarySet>,
    shutdown: Arc<ShutdownCoordinator>,
    events: Arc<dyn EventSink>,
}

impl Supervisor {
    pub fn new(
        registry: Arc<Registry>,
        primaries: Arc<PrimarySet>,
        shutdown: Arc<ShutdownCoordinator>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            registry,
            primaries,
            shutdown,
            events,
        }
    }

    /// Build a supervisor with fresh registry and primary set.
    pub fn with_policy(all_primary: bool, policy: ShutdownPolicy, events: Arc<dyn EventSink>) -> Self {
        let registry = Arc::new(Registry::new());
        let shutdown = Arc::new(ShutdownCoordinator::new(
            Arc::clone(&registry),
            Arc::clone(&events),
            policy,
        ));
        Self::new(
            registry,
            Arc::new(PrimarySet::new(all_primary)),
            shutdown,
            events,
        )
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn primaries(&self) -> &Arc<PrimarySet> {
        &self.primaries
    }

    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    /// Start every command in `group`.
    ///
    /// Returns how many commands were started. For a boot batch the first
    /// start failure is returned after a shutdown round has been launched
    /// against the commands already running; socket batches skip failed
    /// commands and never return an error.
    pub async fn run(&self, group: CommandGroup, origin: Origin) -> SupervisorResult<usize> {
        let last = group.len().saturating_sub(1);
        let mut started = 0;

        for (index, spec) in group.into_iter().enumerate() {
            match self.start(&spec, origin, index == last).await {
                Ok(_) => started += 1,
                Err(e) => {
                    let error = match &e {
                        SupervisorError::Spawn { source, .. } => source.to_string(),
                        other => other.to_string(),
                    };
                    self.events.emit(SupervisorEvent::SpawnFailed {
                        argv: spec.argv().to_vec(),
                        error,
                    });
                    if origin == Origin::Boot {
                        self.begin_shutdown(Signal::Interrupt);
                        return Err(e);
                    }
                }
            }
        }

        Ok(started)
    }

    /// Launch a shutdown round in the background.
    pub fn begin_shutdown(&self, signal: Signal) {
        let shutdown = Arc::clone(&self.shutdown);
        tokio::spawn(async move { shutdown.run(signal).await });
    }

    /// Forward `signal` to every process without escalation.
    pub async fn forward(&self, signal: Signal) {
        self.shutdown.broadcast(signal).await;
    }

    async fn start(&self, spec: &CommandSpec, origin: Origin, last: bool) -> SupervisorResult<u32> {
        // The reaper waits on this gate, so it never sees the child before
        // the registry does.
        let launch = self.registry.launch_gate().await;
        let mut child = spawn(spec)?;
        let Some(pid) = child.id() else {
            drop(launch);
            // Already reaped: nothing left to supervise.
            let _ = child.wait().await;
            return Err(SupervisorError::MissingPid {
                argv: spec.argv().to_vec(),
            });
        };
        let argv = spec.argv().to_vec();

        if origin == Origin::Boot && (last || self.primaries.all().await) {
            self.primaries.set(pid).await;
        }

        self.events.emit(SupervisorEvent::Started {
            pid,
            argv: argv.clone(),
        });
        self.registry
            .insert(ProcessHandle::new(pid, argv.clone()))
            .await;
        drop(launch);

        self.watch(pid, argv, child);
        Ok(pid)
    }

    fn watch(&self, pid: u32, argv: Vec<String>, mut child: Child) {
        let this = self.clone();
        tokio::spawn(async move {
            let exit = match child.wait().await {
                Ok(status) => ExitKind::from(status),
                // Collected by the reaper before we got to it.
                Err(e) if e.raw_os_error() == Some(libc::ECHILD) => ExitKind::Exited(None),
                Err(e) => ExitKind::Failed(e.to_string()),
            };
            this.events
                .emit(SupervisorEvent::Finished { pid, argv, exit });
            this.registry.remove(pid).await;
            let was_primary = this.primaries.remove(pid).await;

            if this.primaries.all().await {
                this.events.emit(SupervisorEvent::AllPrimaryExited { pid });
            } else if was_primary {
                this.events.emit(SupervisorEvent::PrimaryExited { pid });
            } else {
                return;
            }
            this.shutdown.run(Signal::Interrupt).await;
        });
    }
}
