//! Main control loop: runs until the registry is empty.

use std::time::Duration;

use tokio::signal::unix::{SignalKind, signal};

use crate::error::{SupervisorError, SupervisorResult};
use crate::events::SupervisorEvent;
use crate::signal::Signal;
use crate::supervisor::Supervisor;

/// How often the registry is checked for emptiness.
pub const LIVENESS_INTERVAL: Duration = Duration::from_millis(100);

/// Multiplex external signals and the liveness check until every process
/// has exited.
///
/// SIGINT and SIGTERM start a shutdown round with that signal; SIGHUP is
/// forwarded to every process as is. Emits the final goodbye event.
pub async fn wait(supervisor: &Supervisor) -> SupervisorResult<()> {
    let mut interrupt =
        signal(SignalKind::interrupt()).map_err(SupervisorError::SignalHandler)?;
    let mut terminate =
        signal(SignalKind::terminate()).map_err(SupervisorError::SignalHandler)?;
    let mut hangup = signal(SignalKind::hangup()).map_err(SupervisorError::SignalHandler)?;
    let mut tick = tokio::time::interval(LIVENESS_INTERVAL);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                if supervisor.registry().is_empty().await {
                    break;
                }
            }
            Some(()) = hangup.recv() => supervisor.forward(Signal::Hangup).await,
            Some(()) = interrupt.recv() => supervisor.begin_shutdown(Signal::Interrupt),
            Some(()) = terminate.recv() => supervisor.begin_shutdown(Signal::Terminate),
        }
    }

    supervisor.events().emit(SupervisorEvent::Goodbye);
    Ok(())
}
