//! Fuzz target for ServerDriver event processing
//!
//! # Strategy
//!
//! - Sessions: a small id space so connects, requests and closes collide
//! - Requests: well-formed payloads with arbitrary (often invalid) text
//! - Raw frames: arbitrary bytes under arbitrary opcodes
//! - Uploads: `ContentPublished` events for live, closed and unjoined sessions
//!
//! # Invariants
//!
//! - The driver only errors for unknown or duplicate sessions
//! - Every broadcast goes to joined sessions only
//! - Every group member is a joined participant
//! - Joined participants are a subset of open connections

#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use snapshare_harness::SimEnv;
use snapshare_proto::{
    Frame, FrameHeader, Opcode, Payload,
    payloads::{
        content::{AddComment, ContentId, Scope},
        group::{CreateGroup, JoinGroup},
        session::{Goodbye, Join},
    },
};
use snapshare_server::{DriverConfig, DriverError, ServerAction, ServerDriver, ServerEvent};

#[derive(Debug, Arbitrary)]
enum FuzzEvent {
    Connect { session: u8 },
    Close { session: u8 },
    Request { session: u8, request: Request },
    RawFrame { session: u8, opcode: u8, payload: Vec<u8> },
    Published { session: u8, group: Option<String>, caption: Option<String> },
}

#[derive(Debug, Arbitrary)]
enum Request {
    Join(String),
    CreateGroup(String),
    JoinGroup(String),
    Comment { item: u8, text: String },
    Goodbye,
}

fn session_id(session: u8) -> u64 {
    u64::from(session % 8)
}

fuzz_target!(|events: Vec<FuzzEvent>| {
    let config = DriverConfig { max_connections: 6, ..Default::default() };
    let mut driver = ServerDriver::new(SimEnv::with_seed(0), config);
    let mut published: Vec<ContentId> = Vec::new();

    for event in events {
        let event = match event {
            FuzzEvent::Connect { session } => {
                ServerEvent::ConnectionAccepted { session_id: session_id(session) }
            },
            FuzzEvent::Close { session } => ServerEvent::ConnectionClosed {
                session_id: session_id(session),
                reason: "fuzz".to_string(),
            },
            FuzzEvent::Request { session, request } => {
                let payload = match request {
                    Request::Join(display_name) => Payload::Join(Join { display_name }),
                    Request::CreateGroup(name) => Payload::CreateGroup(CreateGroup { name }),
                    Request::JoinGroup(name) => Payload::JoinGroup(JoinGroup { name }),
                    Request::Comment { item, text } => {
                        let content_id = published
                            .get(item as usize % published.len().max(1))
                            .copied()
                            .unwrap_or(ContentId(u64::from(item)));
                        Payload::AddComment(AddComment { content_id, text })
                    },
                    Request::Goodbye => Payload::Goodbye(Goodbye::default()),
                };
                let Ok(frame) = payload.into_frame_for(1) else {
                    continue;
                };
                ServerEvent::FrameReceived { session_id: session_id(session), frame }
            },
            FuzzEvent::RawFrame { session, opcode, payload } => {
                let opcode = Opcode::ALL[opcode as usize % Opcode::ALL.len()];
                let frame = Frame::new(FrameHeader::new(opcode), Bytes::from(payload));
                ServerEvent::FrameReceived { session_id: session_id(session), frame }
            },
            FuzzEvent::Published { session, group, caption } => ServerEvent::ContentPublished {
                session_id: session_id(session),
                request_id: 2,
                scope: group.map_or(Scope::Global, Scope::Group),
                caption,
                asset_ref: "/uploads/fuzz.png".to_string(),
            },
        };

        let actions = match driver.process_event(event) {
            Ok(actions) => actions,
            Err(DriverError::SessionNotFound(_) | DriverError::SessionAlreadyExists(_)) => continue,
            Err(e) => panic!("unexpected driver error: {e}"),
        };

        for action in &actions {
            match action {
                ServerAction::Broadcast { recipients, .. } => {
                    for id in recipients {
                        assert!(driver.is_joined(*id), "broadcast to unjoined session {id}");
                    }
                },
                ServerAction::SendToSession { frame, .. } => {
                    if let Ok(Payload::PublishAccepted(accepted)) = Payload::from_frame(frame) {
                        published.push(accepted.content_id);
                    }
                },
                ServerAction::CloseConnection { .. } | ServerAction::Log { .. } => {},
            }
        }

        for name in driver.groups().list_names() {
            for member in driver.groups().members(&name).unwrap() {
                assert!(
                    driver.directory().has_participant(member),
                    "group {name} holds departed session {member}"
                );
            }
        }
        assert!(driver.participant_count() <= driver.connection_count());
    }
});
