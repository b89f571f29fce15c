//! Driver error types.
//!
//! Client mistakes (bad names, unjoined senders, duplicate groups) are not
//! errors at this level: the driver answers them with an error frame. A
//! `DriverError` means the runtime fed the driver something inconsistent or
//! an outbound frame could not be encoded.

use std::fmt;

use crate::{content_store::ContentError, directory::DirectoryError, group_registry::GroupError};

/// Errors returned by [`crate::ServerDriver::process_event`].
#[derive(Debug)]
pub enum DriverError {
    /// Session not known to the driver.
    ///
    /// The runtime delivered a frame for a connection it never announced, or
    /// one the driver already closed. The runtime should drop the frame.
    SessionNotFound(u64),

    /// Session ID announced twice.
    ///
    /// Session IDs must be unique for the lifetime of the process. This is a
    /// runtime bug.
    SessionAlreadyExists(u64),

    /// Directory and connection table disagree.
    Directory(DirectoryError),

    /// Group registry rejected an operation the driver had already checked.
    Group(GroupError),

    /// Content store rejected an operation the driver had already checked.
    Content(ContentError),

    /// Failed to encode an outbound frame.
    Protocol(String),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound(id) => write!(f, "session not found: {id}"),
            Self::SessionAlreadyExists(id) => write!(f, "session already exists: {id}"),
            Self::Directory(err) => write!(f, "directory error: {err}"),
            Self::Group(err) => write!(f, "group error: {err}"),
            Self::Content(err) => write!(f, "content error: {err}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Directory(err) => Some(err),
            Self::Group(err) => Some(err),
            Self::Content(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DirectoryError> for DriverError {
    fn from(err: DirectoryError) -> Self {
        Self::Directory(err)
    }
}

impl From<GroupError> for DriverError {
    fn from(err: GroupError) -> Self {
        Self::Group(err)
    }
}

impl From<ContentError> for DriverError {
    fn from(err: ContentError) -> Self {
        Self::Content(err)
    }
}

impl From<snapshare_proto::ProtocolError> for DriverError {
    fn from(err: snapshare_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn display_includes_session() {
        assert_eq!(DriverError::SessionNotFound(7).to_string(), "session not found: 7");
    }

    #[test]
    fn wrapped_errors_expose_source() {
        let err = DriverError::from(GroupError::NotFound("Work".to_string()));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("Work"));
    }
}
