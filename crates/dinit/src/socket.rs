//! Control socket for adding commands to a running supervisor.
//!
//! One connection carries one batch: the client writes a wire record of
//! `-r CMD ARGS...` tokens and closes its end. Nothing is written back.
//! Arguments arrive as final values and are not expanded again.
//! Commands started this way are never primary and a failure to start one
//! only affects that command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use dinit_protocol::CommandGroup;
use log::{debug, error, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};

use crate::error::{SupervisorError, SupervisorResult};
use crate::events::SupervisorEvent;
use crate::supervisor::{Origin, Supervisor};

/// Default socket path.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/dinit.sock";

/// Largest payload accepted on one connection.
pub const MAX_PAYLOAD: u64 = 64 * 1024;

/// Listening side of the control socket.
pub struct ControlSocket {
    listener: UnixListener,
    path: PathBuf,
}

impl ControlSocket {
    /// Bind the socket, replacing a stale socket file.
    pub fn bind(path: impl Into<PathBuf>) -> SupervisorResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = std::fs::remove_file(&path);

        let listener = UnixListener::bind(&path).map_err(|source| SupervisorError::Bind {
            path: path.clone(),
            source,
        })?;
        info!("socket: listening on {}", path.display());
        Ok(Self { listener, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept connections forever, one task per connection.
    pub async fn serve(self, supervisor: Supervisor) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    let supervisor = supervisor.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &supervisor).await {
                            warn!("socket: {e:#}");
                        }
                    });
                }
                Err(e) => error!("socket: accept error: {e}"),
            }
        }
    }
}

/// Remove the socket file, ignoring a file that is already gone.
pub fn remove_socket_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("socket: failed to remove {}: {e}", path.display());
    }
}

/// Read one batch from `stream` and start it.
///
/// Each executable is resolved on its own; one that cannot be found is
/// reported and skipped while the rest of the batch still starts. Returns
/// how many commands were started.
pub async fn handle_connection(stream: UnixStream, supervisor: &Supervisor) -> Result<usize> {
    let mut payload = Vec::new();
    stream
        .take(MAX_PAYLOAD + 1)
        .read_to_end(&mut payload)
        .await
        .context("error reading data")?;
    if payload.len() as u64 > MAX_PAYLOAD {
        bail!("payload exceeds {MAX_PAYLOAD} bytes");
    }

    let decoded = dinit_protocol::decode_payload(&payload).context("invalid command batch")?;
    if !decoded.flags.is_empty() {
        warn!("socket: ignoring flags {:?}", decoded.flags);
    }
    debug!("socket: received {} command(s)", decoded.commands.len());

    let mut runnable = Vec::with_capacity(decoded.commands.len());
    for spec in decoded.commands {
        let argv = spec.argv().to_vec();
        match dinit_protocol::resolve_program(spec) {
            Ok(spec) => runnable.push(spec),
            Err(e) => supervisor.events().emit(SupervisorEvent::SpawnFailed {
                argv,
                error: e.to_string(),
            }),
        }
    }

    let started = supervisor
        .run(CommandGroup::new(runnable), Origin::Socket)
        .await?;
    Ok(started)
}

/// Send `group` to a running supervisor listening on `path`.
pub async fn submit(path: &Path, group: &CommandGroup) -> Result<()> {
    let payload = dinit_protocol::encode_payload(group).context("encoding commands")?;

    let mut stream = UnixStream::connect(path)
        .await
        .with_context(|| format!("connecting to {}", path.display()))?;
    stream
        .write_all(&payload)
        .await
        .context("writing commands")?;
    stream.shutdown().await.context("closing connection")?;
    Ok(())
}
