//! Runtime error types.

use std::fmt;

use crate::{driver_error::DriverError, storage::StorageError};

/// Errors that can occur in the server runtime.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error (invalid bind address, missing TLS material,
    /// unusable upload directory).
    ///
    /// Fatal at startup. Fix configuration and restart.
    Config(String),

    /// Transport/network error.
    ///
    /// May be transient (one connection dropped) or fatal (bind address in
    /// use).
    Transport(String),

    /// A client sent bytes that are not a valid frame.
    ///
    /// Fatal for that connection only.
    Protocol(String),

    /// Internal error (unexpected state, logic bug).
    Internal(String),

    /// Error from the driver.
    Driver(DriverError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
            Self::Driver(err) => write!(f, "driver error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Driver(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DriverError> for ServerError {
    fn from(err: DriverError) -> Self {
        Self::Driver(err)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<snapshare_proto::ProtocolError> for ServerError {
    fn from(err: snapshare_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<StorageError> for ServerError {
    fn from(err: StorageError) -> Self {
        Self::Config(format!("upload storage: {err}"))
    }
}
