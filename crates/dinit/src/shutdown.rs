//! Escalating shutdown of every registered process.

use std::sync::Arc;
use std::time::Duration;

use crate::events::{EventSink, SupervisorEvent};
use crate::registry::Registry;
use crate::signal::Signal;

/// Pause between the graceful signal and the residual check.
pub const SETTLE_WINDOW: Duration = Duration::from_secs(2);

/// Default pause between the residual check and SIGKILL.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(10);

/// Timing of a shutdown round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownPolicy {
    pub settle: Duration,
    pub grace: Duration,
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self {
            settle: SETTLE_WINDOW,
            grace: DEFAULT_GRACE,
        }
    }
}

/// Runs shutdown rounds against the registry.
///
/// A round signals every process, waits the settle window, and if anything
/// is still registered waits the grace window and sends SIGKILL. Rounds may
/// overlap; each one works from its own registry snapshots and always runs
/// to completion.
pub struct ShutdownCoordinator {
    registry: Arc<Registry>,
    events: Arc<dyn EventSink>,
    policy: ShutdownPolicy,
}

impl ShutdownCoordinator {
    pub fn new(registry: Arc<Registry>, events: Arc<dyn EventSink>, policy: ShutdownPolicy) -> Self {
        Self {
            registry,
            events,
            policy,
        }
    }

    pub fn policy(&self) -> ShutdownPolicy {
        self.policy
    }

    /// Run one shutdown round starting with `signal`.
    pub async fn run(&self, signal: Signal) {
        self.broadcast(signal).await;

        tokio::time::sleep(self.policy.settle).await;

        let count = self.registry.len().await;
        if count == 0 {
            return;
        }
        self.events.emit(SupervisorEvent::Lingering {
            count,
            grace: self.policy.grace,
        });

        tokio::time::sleep(self.policy.grace).await;
        self.broadcast(Signal::Kill).await;
    }

    /// Send `signal` to every process without escalation.
    pub async fn broadcast(&self, signal: Signal) {
        for pid in self.registry.signal(signal).await {
            self.events.emit(SupervisorEvent::SignalSent { pid, signal });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::registry::ProcessHandle;

    #[tokio::test]
    async fn test_empty_registry_round_is_quiet() {
        let registry = Arc::new(Registry::new());
        let sink = Arc::new(RecordingSink::new());
        let coordinator = ShutdownCoordinator::new(
            registry,
            sink.clone(),
            ShutdownPolicy {
                settle: Duration::from_millis(10),
                grace: Duration::from_millis(10),
            },
        );

        coordinator.run(Signal::Interrupt).await;
        assert!(sink.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lingering_process_is_killed() {
        let registry = Arc::new(Registry::new());
        let sink = Arc::new(RecordingSink::new());
        // A pid nobody owns: registered, never removed, signals bounce off.
        registry
            .insert(ProcessHandle::new(i32::MAX as u32, vec!["ghost".into()]))
            .await;
        let coordinator =
            ShutdownCoordinator::new(registry, sink.clone(), ShutdownPolicy::default());

        coordinator.run(Signal::Terminate).await;

        assert_eq!(
            sink.events(),
            vec![
                SupervisorEvent::SignalSent {
                    pid: i32::MAX as u32,
                    signal: Signal::Terminate
                },
                SupervisorEvent::Lingering {
                    count: 1,
                    grace: DEFAULT_GRACE
                },
                SupervisorEvent::SignalSent {
                    pid: i32::MAX as u32,
                    signal: Signal::Kill
                },
            ]
        );
    }
}
