//! Primary process tracking.
//!
//! The exit of a primary process ends the container: every other process
//! is shut down. Only boot-time commands are ever marked.

use std::collections::HashSet;

use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct PrimaryState {
    pids: HashSet<u32>,
    all: bool,
}

/// Set of primary pids plus the "every process is primary" switch.
#[derive(Debug, Default)]
pub struct PrimarySet {
    state: RwLock<PrimaryState>,
}

impl PrimarySet {
    pub fn new(all: bool) -> Self {
        Self {
            state: RwLock::new(PrimaryState {
                pids: HashSet::new(),
                all,
            }),
        }
    }

    /// Mark `pid` as primary.
    pub async fn set(&self, pid: u32) {
        self.state.write().await.pids.insert(pid);
    }

    pub async fn set_all(&self, all: bool) {
        self.state.write().await.all = all;
    }

    /// Whether `pid` was explicitly marked primary.
    pub async fn primary(&self, pid: u32) -> bool {
        self.state.read().await.pids.contains(&pid)
    }

    /// Forget `pid` once its process has exited, so a recycled pid is never
    /// mistaken for a primary. Returns whether it was primary.
    pub async fn remove(&self, pid: u32) -> bool {
        self.state.write().await.pids.remove(&pid)
    }

    /// Whether every process counts as primary.
    pub async fn all(&self) -> bool {
        self.state.read().await.all
    }
}
