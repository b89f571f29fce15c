//! Deterministic simulation harness for Snapshare.
//!
//! Turmoil-based runtime, environment and client for reproducible end-to-end
//! tests of the engine over simulated TCP.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation of the engine's
//! membership and fan-out rules. Operations are applied to both the model and
//! the real [`snapshare_server::ServerDriver`], and the sets of recipients for
//! each event kind are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod sim_client;
pub mod sim_env;
pub mod sim_server;
mod wire;

pub use model::{
    ClientId, EventKind, GROUP_NAMES, GroupSlot, ModelWorld, ObservableState, Operation,
    OperationResult, Outcome, Rejection, Target,
};
pub use sim_client::SimClient;
pub use sim_env::SimEnv;
pub use sim_server::SimServer;
pub use wire::read_frame;
