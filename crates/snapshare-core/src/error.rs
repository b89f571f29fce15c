//! Error types for the snapshare core.

use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors from the connection lifecycle state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Operation is not allowed in the current state
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        /// Current state when error occurred
        state: ConnectionState,
        /// Operation that was attempted
        operation: &'static str,
    },
}

/// Client-supplied text was rejected before any state was touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is empty or whitespace only
    #[error("{field} must not be blank")]
    Blank {
        /// Field name
        field: &'static str,
    },

    /// Field exceeds its length limit (in characters)
    #[error("{field} is too long: {actual} characters (max {max})")]
    TooLong {
        /// Field name
        field: &'static str,
        /// Limit
        max: usize,
        /// Submitted length
        actual: usize,
    },
}
