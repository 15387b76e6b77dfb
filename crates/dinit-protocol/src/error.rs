//! Codec error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while decoding a `-r` token stream.
///
/// On the command line these are fatal configuration errors; on the control
/// socket they only drop the offending connection.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// `-r` was the final token.
    #[error("need a command after -r")]
    MissingCommand,

    /// The executable following `-r` could not be found.
    #[error("invalid command {command:?}: {source}")]
    Unresolvable {
        command: String,
        #[source]
        source: which::Error,
    },

    /// The resolved executable path cannot be carried as a string.
    #[error("command path {0:?} is not valid UTF-8")]
    NonUtf8Path(PathBuf),

    /// The wire record itself was malformed.
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Errors raised by the wire record encoding.
#[derive(Debug, Error)]
pub enum WireError {
    /// Nothing to encode, or no record in the payload.
    #[error("empty command record")]
    Empty,

    /// The record could not be parsed or written.
    #[error("malformed command record: {0}")]
    Csv(#[from] csv::Error),

    /// Generic IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
