//! dinit: a minimal init process for containers.
//!
//! Starts the commands given as `-r CMD ARGS...` groups, forwards signals to
//! them, reaps orphans when running as PID 1, and exits once every command
//! has exited. The last command on the command line is primary: when it
//! exits, everything else is shut down.
//!
//! Further commands can be added at runtime through a unix socket
//! ([`socket`]); those are never primary.

pub mod config;
pub mod error;
pub mod events;
pub mod hooks;
pub mod lifecycle;
pub mod primary;
pub mod reaper;
pub mod registry;
pub mod shutdown;
pub mod signal;
pub mod socket;
pub mod supervisor;

pub use error::{SupervisorError, SupervisorResult};
pub use events::{EventSink, ExitKind, LogSink, RecordingSink, SupervisorEvent};
pub use registry::{ProcessHandle, Registry};
pub use shutdown::{ShutdownCoordinator, ShutdownPolicy};
pub use signal::Signal;
pub use supervisor::{Origin, Supervisor};
