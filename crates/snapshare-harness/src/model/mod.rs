//! Reference model for model-based testing.
//!
//! [`ModelWorld`] is a deliberately naive restatement of the engine's rules:
//! plain sets and vectors, no indexes, no protocol. For each [`Operation`] it
//! reports which clients should receive which kind of event. Tests apply the
//! same operations to the real driver and compare.

mod operation;
mod world;

pub use operation::{
    ClientId, EventKind, GROUP_NAMES, GroupSlot, Operation, OperationResult, Outcome, Rejection,
    Target,
};
pub use world::{ModelWorld, ObservableState};
