//! Command line and socket wire codec for dinit.
//!
//! A dinit invocation carries one or more command groups on its command line:
//!
//! ```text
//! dinit [FLAG]... -r CMD [ARG]... [-r CMD [ARG]...]...
//! ```
//!
//! [`args`] converts between that flat token stream and an ordered
//! [`CommandGroup`], and [`wire`] serialises the same token stream into the
//! single quote-aware record that travels over the control socket.
//!
//! Decoding the command line resolves every executable against `PATH` and
//! expands `$NAME` references in arguments, so a decoded group is ready to
//! spawn. The socket payload carries those final values: it is split back
//! into commands without expanding anything, and the receiver resolves each
//! executable on its own with [`args::resolve_program`].

pub mod args;
pub mod error;
pub mod wire;

pub use args::{CommandGroup, CommandSpec, Decoded, decode, encode, resolve_program, split};
pub use error::{DecodeError, WireError};

/// Decode a socket payload into a command group.
///
/// The payload is a single wire record holding the token stream written by
/// [`encode`]. Executables are left unresolved.
pub fn decode_payload(payload: &[u8]) -> Result<Decoded, DecodeError> {
    let tokens = wire::from_bytes(payload)?;
    split(tokens)
}

/// Encode a command group into a socket payload.
pub fn encode_payload(group: &CommandGroup) -> Result<Vec<u8>, WireError> {
    wire::to_bytes(&encode(group))
}
