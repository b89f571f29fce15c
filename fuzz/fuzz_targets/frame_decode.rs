//! Fuzz target for Frame::decode
//!
//! Arbitrary bytes are decoded as a frame, and any frame that decodes has its
//! payload decoded too. Looks for:
//! - Parser crashes or panics
//! - Integer overflows in size calculations
//! - Malformed headers that bypass validation
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use snapshare_proto::{Frame, FrameHeader, Payload};

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = Frame::decode(data) else {
        return;
    };

    assert!(frame.payload.len() <= FrameHeader::MAX_PAYLOAD_SIZE as usize);
    assert_eq!(frame.payload.len(), frame.header.payload_size() as usize);

    // A frame that decoded must re-encode to the bytes it came from.
    let mut encoded = Vec::new();
    frame.encode(&mut encoded).unwrap();
    assert_eq!(&encoded[..], &data[..frame.wire_len()]);

    let _ = Payload::from_frame(&frame);
});
