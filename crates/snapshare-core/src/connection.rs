//! Per-connection lifecycle.
//!
//! A transport connection starts `Unjoined`: it has no identity and may only
//! send `Join`. A successful join moves it to `Joined`, where it stays until it
//! disconnects. `Closed` is terminal; a client that wants back in opens a new
//! connection.
//!
//! ```text
//! ┌──────────┐  join   ┌────────┐  disconnect  ┌────────┐
//! │ Unjoined │────────>│ Joined │─────────────>│ Closed │
//! └──────────┘         └────────┘              └────────┘
//!       │                                           ^
//!       └───────────────── disconnect ──────────────┘
//! ```
//!
//! Like the rest of the engine this is pure: time is passed in, nothing is
//! sent from here.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use crate::error::ConnectionError;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport-registered, no identity yet
    Unjoined,
    /// Identified by a display name
    Joined,
    /// Disconnected (terminal)
    Closed,
}

/// Lifecycle of a single transport connection.
///
/// Generic over `Instant` so simulations can use virtual time.
#[derive(Debug, Clone)]
pub struct Connection<I = Instant>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    session_id: u64,
    state: ConnectionState,
    accepted_at: I,
    last_activity: I,
    display_name: Option<String>,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// New connection in [`ConnectionState::Unjoined`].
    pub fn new(session_id: u64, now: I) -> Self {
        Self {
            session_id,
            state: ConnectionState::Unjoined,
            accepted_at: now,
            last_activity: now,
            display_name: None,
        }
    }

    /// Session handle assigned by the runtime.
    #[must_use]
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the connection has joined and not yet closed.
    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.state == ConnectionState::Joined
    }

    /// Display name chosen at join time. `None` before joining.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Time since the connection was accepted.
    #[must_use]
    pub fn age(&self, now: I) -> Duration {
        now - self.accepted_at
    }

    /// Time since the last request on this connection.
    #[must_use]
    pub fn idle_for(&self, now: I) -> Duration {
        now - self.last_activity
    }

    /// Record activity.
    pub fn touch(&mut self, now: I) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    /// Transition `Unjoined -> Joined`.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if already joined or closed. There is
    ///   no rejoin on the same connection.
    pub fn join(&mut self, display_name: String, now: I) -> Result<(), ConnectionError> {
        if self.state != ConnectionState::Unjoined {
            return Err(ConnectionError::InvalidState { state: self.state, operation: "join" });
        }

        self.state = ConnectionState::Joined;
        self.display_name = Some(display_name);
        self.touch(now);
        Ok(())
    }

    /// Display name of a joined connection.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` unless the connection is `Joined`
    pub fn require_joined(&self, operation: &'static str) -> Result<&str, ConnectionError> {
        match (self.state, self.display_name.as_deref()) {
            (ConnectionState::Joined, Some(name)) => Ok(name),
            (state, _) => Err(ConnectionError::InvalidState { state, operation }),
        }
    }

    /// Transition to `Closed`. Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        if self.state == ConnectionState::Closed {
            return false;
        }
        self.state = ConnectionState::Closed;
        true
    }
}
