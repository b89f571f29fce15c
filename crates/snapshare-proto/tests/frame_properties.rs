//! Property-based tests for frame and payload encoding.
//!
//! Frames arrive back to back on a single stream, so decoding must consume
//! exactly `wire_len()` bytes per frame and never read into the next one.

use bytes::Bytes;
use proptest::prelude::*;
use snapshare_proto::{
    Frame, FrameHeader, Opcode, Payload, ProtocolError,
    payloads::{
        content::{AddComment, Comment, ContentId, ContentItem, NewComment, Scope},
        group::{CreateGroup, GroupNameList},
        session::{RosterEntry, RosterUpdate},
    },
};

fn arbitrary_opcode() -> impl Strategy<Value = Opcode> {
    prop::sample::select(Opcode::ALL.to_vec())
}

fn arbitrary_frame() -> impl Strategy<Value = Frame> {
    (arbitrary_opcode(), any::<u32>(), prop::collection::vec(any::<u8>(), 0..1024)).prop_map(
        |(opcode, request_id, payload)| {
            let mut header = FrameHeader::new(opcode);
            header.set_request_id(request_id);
            Frame::new(header, Bytes::from(payload))
        },
    )
}

fn arbitrary_scope() -> impl Strategy<Value = Scope> {
    prop_oneof![Just(Scope::Global), "[A-Za-z]{1,12}".prop_map(Scope::Group)]
}

fn arbitrary_item() -> impl Strategy<Value = ContentItem> {
    (
        any::<u64>(),
        "[a-z]{1,16}",
        arbitrary_scope(),
        proptest::option::of(".{0,40}"),
        prop::collection::vec(("[a-z]{1,8}", ".{0,40}", any::<u64>()), 0..4),
    )
        .prop_map(|(id, author, scope, caption, comments)| ContentItem {
            id: ContentId(id),
            author,
            scope,
            caption,
            asset_ref: format!("/uploads/{id}-1.png"),
            created_at_ms: id,
            comments: comments
                .into_iter()
                .map(|(author, text, created_at_ms)| Comment { author, text, created_at_ms })
                .collect(),
        })
}

#[test]
fn prop_back_to_back_frames_decode_in_order() {
    proptest!(|(frames in prop::collection::vec(arbitrary_frame(), 1..8))| {
        let mut wire = Vec::new();
        for frame in &frames {
            frame.encode(&mut wire).expect("encode should succeed");
        }

        let mut offset = 0;
        for expected in &frames {
            let decoded = Frame::decode(&wire[offset..]).expect("decode should succeed");
            prop_assert_eq!(&decoded, expected);
            offset += decoded.wire_len();
        }

        prop_assert_eq!(offset, wire.len(), "all bytes consumed");
    });
}

#[test]
fn prop_any_prefix_of_a_frame_is_rejected() {
    proptest!(|(frame in arbitrary_frame(), cut in any::<prop::sample::Index>())| {
        let mut wire = Vec::new();
        frame.encode(&mut wire).expect("encode should succeed");

        let len = cut.index(wire.len());
        let result = Frame::decode(&wire[..len]);
        prop_assert!(matches!(
            result,
            Err(ProtocolError::FrameTooShort { .. } | ProtocolError::FrameTruncated { .. })
        ), "expected FrameTooShort or FrameTruncated");
    });
}

#[test]
fn prop_content_payloads_survive_the_wire() {
    proptest!(|(item in arbitrary_item(), request_id in any::<u32>())| {
        let payload = Payload::NewContent(snapshare_proto::payloads::content::NewContent { item });
        let frame = payload.clone().into_frame_for(request_id).expect("should frame");

        let mut wire = Vec::new();
        frame.encode(&mut wire).expect("should encode");
        let decoded = Frame::decode(&wire).expect("should decode");

        prop_assert_eq!(decoded.header.request_id(), request_id);
        prop_assert_eq!(Payload::from_frame(&decoded).expect("should parse"), payload);
    });
}

#[test]
fn garbage_bytes_never_panic() {
    proptest!(|(bytes in prop::collection::vec(any::<u8>(), 0..256))| {
        if let Ok(frame) = Frame::decode(&bytes) {
            let _ = Payload::from_frame(&frame);
        }
    });
}

#[test]
fn request_payloads_carry_their_opcode() {
    let cases = [
        Payload::CreateGroup(CreateGroup { name: "Friends".to_string() }),
        Payload::AddComment(AddComment { content_id: ContentId(5), text: "hi".to_string() }),
        Payload::GroupNameList(GroupNameList {
            names: vec!["Friends".to_string(), "Family".to_string(), "Work".to_string()],
        }),
        Payload::RosterUpdate(RosterUpdate {
            participants: vec![RosterEntry { session_id: 1, display_name: "ada".to_string() }],
        }),
        Payload::NewComment(NewComment {
            content_id: ContentId(5),
            comment: Comment { author: "ada".to_string(), text: "hi".to_string(), created_at_ms: 9 },
        }),
    ];

    for payload in cases {
        let frame = payload.clone().into_frame_for(1).expect("should frame");
        assert_eq!(frame.opcode(), Some(payload.opcode()));
        assert_eq!(Payload::from_frame(&frame).expect("should parse"), payload);
    }
}
