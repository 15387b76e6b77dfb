//! Shared helpers for supervisor integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use dinit::{
    ExitKind, RecordingSink, ShutdownPolicy, Signal, Supervisor, SupervisorEvent, lifecycle,
};
use dinit_protocol::{CommandGroup, CommandSpec};

/// Short windows so escalation finishes quickly.
pub const TEST_POLICY: ShutdownPolicy = ShutdownPolicy {
    settle: Duration::from_millis(300),
    grace: Duration::from_millis(500),
};

/// Upper bound for any single test scenario.
pub const DEADLINE: Duration = Duration::from_secs(10);

pub fn harness(all_primary: bool) -> (Supervisor, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let supervisor = Supervisor::with_policy(all_primary, TEST_POLICY, sink.clone());
    (supervisor, sink)
}

pub fn group(commands: &[&[&str]]) -> CommandGroup {
    commands
        .iter()
        .map(|argv| {
            CommandSpec::from_argv(argv.iter().map(|s| s.to_string()).collect())
                .expect("non-empty argv")
        })
        .collect()
}

/// Run the main loop until the registry is empty.
pub async fn wait(supervisor: &Supervisor) {
    tokio::time::timeout(DEADLINE, lifecycle::wait(supervisor))
        .await
        .expect("supervisor did not finish in time")
        .expect("main loop failed");
}

/// Kill everything still running and wait for the main loop to finish.
pub async fn teardown(supervisor: &Supervisor) {
    supervisor.registry().signal(Signal::Kill).await;
    wait(supervisor).await;
}

/// Poll `sink` until `predicate` holds for its events.
pub async fn wait_for_events<F>(sink: &RecordingSink, predicate: F)
where
    F: Fn(&[SupervisorEvent]) -> bool,
{
    tokio::time::timeout(DEADLINE, async {
        while !predicate(&sink.events()) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("expected events never arrived");
}

/// Pids of started processes in start order, paired with their argv.
pub fn started(events: &[SupervisorEvent]) -> Vec<(u32, Vec<String>)> {
    events
        .iter()
        .filter_map(|event| match event {
            SupervisorEvent::Started { pid, argv } => Some((*pid, argv.clone())),
            _ => None,
        })
        .collect()
}

pub fn exit_of(events: &[SupervisorEvent], target: u32) -> Option<ExitKind> {
    events.iter().find_map(|event| match event {
        SupervisorEvent::Finished { pid, exit, .. } if *pid == target => Some(exit.clone()),
        _ => None,
    })
}

pub fn signals_to(events: &[SupervisorEvent], target: u32) -> Vec<Signal> {
    events
        .iter()
        .filter_map(|event| match event {
            SupervisorEvent::SignalSent { pid, signal } if *pid == target => Some(*signal),
            _ => None,
        })
        .collect()
}

pub fn position(events: &[SupervisorEvent], wanted: &SupervisorEvent) -> Option<usize> {
    events.iter().position(|event| event == wanted)
}
