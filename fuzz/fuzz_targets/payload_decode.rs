//! Fuzz target for Payload::decode
//!
//! Feeds arbitrary CBOR under every opcode:
//! - Malformed CBOR data
//! - Type confusion (payload bytes for one opcode sent under another)
//! - Oversized strings or collections
//!
//! Payloads that decode must encode back to something that decodes to the
//! same value.

#![no_main]

use libfuzzer_sys::fuzz_target;
use snapshare_proto::{Opcode, Payload};

fuzz_target!(|data: &[u8]| {
    for opcode in Opcode::ALL {
        let Ok(payload) = Payload::decode(opcode, data) else {
            continue;
        };

        assert_eq!(payload.opcode(), opcode);

        let mut encoded = Vec::new();
        payload.encode(&mut encoded).unwrap();
        assert_eq!(Payload::decode(opcode, &encoded).unwrap(), payload);
    }
});
