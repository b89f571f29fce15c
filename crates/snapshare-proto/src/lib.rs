//! Snapshare wire protocol.
//!
//! Every message on the wire is a [`Frame`]: a fixed 16-byte big-endian
//! [`FrameHeader`] followed by a CBOR payload. The header carries the
//! [`Opcode`] that identifies the payload type, so payloads are serialized
//! without a variant tag (see [`Payload`]).
//!
//! # Layout
//!
//! ```text
//! 0      4   5   6      8          12         16
//! +------+---+---+------+----------+----------+--------------
//! | SNAP |ver|flg|opcode|request id|payload sz| CBOR payload
//! +------+---+---+------+----------+----------+--------------
//! ```
//!
//! The protocol crate knows nothing about the engine. It only guarantees that
//! decoded frames are structurally valid (magic, version, size limits) and that
//! payloads round-trip through CBOR.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
mod frame;
mod header;
mod opcode;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use header::FrameHeader;
pub use opcode::Opcode;
pub use payloads::{ErrorPayload, Payload};

/// ALPN identifier negotiated on QUIC connections.
pub const ALPN_PROTOCOL: &[u8] = b"snapshare/1";
