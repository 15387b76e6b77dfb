//! Registry of running processes keyed by pid.
//!
//! An entry exists from the moment a process is started until its watcher
//! observes the exit. Signal broadcast takes a snapshot under the read lock
//! and tolerates targets that exited in the meantime.
//!
//! A separate launch gate covers the gap between spawning a child and
//! inserting it: starts hold it shared, a reap round holds it exclusively.

use std::collections::HashMap;

use log::debug;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::signal::{self, Signal};

/// Bookkeeping handle for a started process.
///
/// The operating system owns the process; this is only what the supervisor
/// needs to signal it and report on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pid: u32,
    argv: Vec<String>,
}

impl ProcessHandle {
    pub fn new(pid: u32, argv: Vec<String>) -> Self {
        Self { pid, argv }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

/// Concurrent map of running processes.
#[derive(Debug, Default)]
pub struct Registry {
    processes: RwLock<HashMap<u32, ProcessHandle>>,
    launch: RwLock<()>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, handle: ProcessHandle) {
        self.processes.write().await.insert(handle.pid, handle);
    }

    pub async fn remove(&self, pid: u32) -> Option<ProcessHandle> {
        self.processes.write().await.remove(&pid)
    }

    pub async fn contains(&self, pid: u32) -> bool {
        self.processes.read().await.contains_key(&pid)
    }

    pub async fn len(&self) -> usize {
        self.processes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.processes.read().await.is_empty()
    }

    /// Held from spawning a child until it is inserted.
    pub async fn launch_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.launch.read().await
    }

    /// Held for a reap round; waits out every launch in progress.
    pub async fn reap_gate(&self) -> RwLockWriteGuard<'_, ()> {
        self.launch.write().await
    }

    /// Pids currently registered, in no particular order.
    pub async fn pids(&self) -> Vec<u32> {
        self.processes.read().await.keys().copied().collect()
    }

    /// Send `signal` to every registered process.
    ///
    /// Returns the pids the signal was addressed to. Delivery errors are
    /// ignored: the process may have exited before its watcher removed it.
    pub async fn signal(&self, signal: Signal) -> Vec<u32> {
        let processes = self.processes.read().await;
        let mut targets = Vec::with_capacity(processes.len());
        for pid in processes.keys().copied() {
            if let Err(e) = signal::send(pid, signal) {
                debug!("{signal} not delivered to pid {pid}: {e}");
            }
            targets.push(pid);
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::sync::Arc;
    use tokio::process::Command;

    #[tokio::test]
    async fn test_insert_remove() {
        let registry = Registry::new();
        assert!(registry.is_empty().await);

        registry.insert(ProcessHandle::new(10, vec!["a".into()])).await;
        registry.insert(ProcessHandle::new(11, vec!["b".into()])).await;
        assert_eq!(registry.len().await, 2);
        assert!(registry.contains(10).await);

        let removed = registry.remove(10).await.unwrap();
        assert_eq!(removed.argv(), ["a"]);
        assert!(registry.remove(10).await.is_none());
        assert_eq!(registry.pids().await, vec![11]);
    }

    #[tokio::test]
    async fn test_reap_gate_waits_for_launch() {
        let registry = Registry::new();

        let launch = registry.launch_gate().await;
        let blocked =
            tokio::time::timeout(std::time::Duration::from_millis(50), registry.reap_gate()).await;
        assert!(blocked.is_err());

        drop(launch);
        let _reap = registry.reap_gate().await;
    }

    #[tokio::test]
    async fn test_concurrent_mutation() {
        let registry = Arc::new(Registry::new());
        let mut tasks = Vec::new();
        for pid in 1..=64u32 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                registry.insert(ProcessHandle::new(pid, vec![])).await;
                if pid % 2 == 0 {
                    registry.remove(pid).await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(registry.len().await, 32);
    }

    #[tokio::test]
    async fn test_signal_reaches_live_process() {
        let registry = Registry::new();
        let mut child = Command::new("sleep").arg("10").kill_on_drop(true).spawn().unwrap();
        let pid = child.id().unwrap();
        registry.insert(ProcessHandle::new(pid, vec!["sleep".into()])).await;

        assert_eq!(registry.signal(Signal::Terminate).await, vec![pid]);
        let status = child.wait().await.unwrap();
        assert_eq!(status.signal(), Some(libc::SIGTERM));
    }

    #[tokio::test]
    async fn test_signal_to_exited_process_is_accepted() {
        let registry = Registry::new();
        let mut child = Command::new("true").spawn().unwrap();
        let pid = child.id().unwrap();
        child.wait().await.unwrap();

        // Registered but already gone: the broadcast still succeeds.
        registry.insert(ProcessHandle::new(pid, vec!["true".into()])).await;
        assert_eq!(registry.signal(Signal::Interrupt).await, vec![pid]);
    }
}
