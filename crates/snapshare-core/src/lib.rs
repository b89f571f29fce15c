//! Snapshare core.
//!
//! Pure, I/O-free building blocks shared by the server runtime and the
//! simulation harness:
//!
//! - [`env::Environment`]: time, randomness and wall clock, injected so that
//!   simulations are reproducible
//! - [`connection::Connection`]: per-connection lifecycle
//!   (`Unjoined -> Joined -> Closed`)
//! - [`validate`]: normalisation and limits for client-supplied text

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod connection;
pub mod env;
pub mod error;
pub mod validate;

pub use connection::{Connection, ConnectionState};
pub use env::Environment;
pub use error::{ConnectionError, ValidationError};
