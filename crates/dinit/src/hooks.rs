//! One-shot start and stop hooks.

use dinit_protocol::CommandSpec;
use dinit_protocol::args::expand_env;
use log::info;

use crate::error::{SupervisorError, SupervisorResult};
use crate::supervisor;

/// Split a hook line on whitespace and expand environment references.
///
/// The executable is looked up in `PATH` when spawned. Returns `None` for a
/// blank line.
pub fn parse_hook(line: &str) -> Option<CommandSpec> {
    let argv = line
        .split_whitespace()
        .map(|field| expand_env(field).into_owned())
        .collect();
    CommandSpec::from_argv(argv)
}

/// Run a hook to completion. A non-zero exit is an error.
pub async fn run_hook(line: &str) -> SupervisorResult<()> {
    let spec = parse_hook(line).ok_or_else(|| SupervisorError::Hook {
        command: line.to_string(),
        reason: "empty command".to_string(),
    })?;

    info!("running hook {spec}");
    let status = supervisor::spawn(&spec)?
        .wait()
        .await
        .map_err(|e| SupervisorError::Hook {
            command: line.to_string(),
            reason: e.to_string(),
        })?;

    if !status.success() {
        return Err(SupervisorError::Hook {
            command: line.to_string(),
            reason: status.to_string(),
        });
    }
    Ok(())
}
