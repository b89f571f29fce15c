//! CBOR-encoded protocol messages.
//!
//! Headers are raw binary, payloads are CBOR. CBOR is self-describing and
//! compact, and new optional fields can be added without breaking older
//! peers.
//!
//! # Invariants
//!
//! Each payload variant maps to exactly one opcode (enforced by match
//! exhaustiveness). Decoding an encoded payload with its own opcode yields an
//! equal value.

pub mod content;
pub mod group;
pub mod session;

use bytes::BufMut;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Frame, FrameHeader, Opcode,
    errors::{ProtocolError, Result},
};

/// All possible frame payloads.
///
/// The payload type is determined by the `Opcode` in the frame header, so only
/// the inner struct is serialized (no variant tag in CBOR). A frame whose
/// opcode and payload disagree fails to decode instead of being
/// misinterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    // Client requests
    /// Enter the session with a display name
    Join(session::Join),
    /// Graceful disconnect
    Goodbye(session::Goodbye),
    /// Create a group
    CreateGroup(group::CreateGroup),
    /// Join a group
    JoinGroup(group::JoinGroup),
    /// Upload and publish a photo
    PublishContent(content::PublishContent),
    /// Comment on an item
    AddComment(content::AddComment),

    // Server events
    /// Global feed for a new participant
    Backlog(content::Backlog),
    /// Participant list
    RosterUpdate(session::RosterUpdate),
    /// Someone joined
    ParticipantJoined(session::ParticipantJoined),
    /// Someone left
    ParticipantLeft(session::ParticipantLeft),
    /// Group names
    GroupNameList(group::GroupNameList),
    /// Group created
    GroupCreated(group::GroupCreated),
    /// Group feed for a new group member
    GroupFeed(group::GroupFeed),
    /// Someone joined a group you belong to
    GroupJoinerNotice(group::GroupJoinerNotice),
    /// Newly published item
    NewContent(content::NewContent),
    /// Newly appended comment
    NewComment(content::NewComment),
    /// Upload stored and published
    PublishAccepted(content::PublishAccepted),

    /// Error reply
    Error(ErrorPayload),
}

/// Error payload for error frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error code identifying the type of error.
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorPayload {
    /// Malformed or missing field, or request not valid in the current state.
    pub const VALIDATION: u16 = 0x0001;
    /// Referenced entity does not exist. Reserved: unknown groups and
    /// comment targets are ignored without a reply.
    pub const NOT_FOUND: u16 = 0x0002;
    /// Entity already exists.
    pub const CONFLICT: u16 = 0x0003;
    /// Payload could not be decoded or opcode is not a request.
    pub const INVALID_PAYLOAD: u16 = 0x0004;
    /// Upload rejected (missing, too large, or unsupported type).
    pub const ASSET_REJECTED: u16 = 0x0005;
    /// Server is at its connection limit.
    pub const CAPACITY: u16 = 0x0006;

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self { code: Self::VALIDATION, message: msg.into() }
    }

    /// Create a conflict error.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self { code: Self::CONFLICT, message: msg.into() }
    }

    /// Create an invalid payload error.
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self { code: Self::INVALID_PAYLOAD, message: msg.into() }
    }

    /// Create an upload rejection.
    pub fn asset_rejected(msg: impl Into<String>) -> Self {
        Self { code: Self::ASSET_REJECTED, message: msg.into() }
    }

    /// Create a capacity error.
    pub fn capacity(msg: impl Into<String>) -> Self {
        Self { code: Self::CAPACITY, message: msg.into() }
    }
}

fn decode_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
}

impl Payload {
    /// Opcode corresponding to this payload type.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Join(_) => Opcode::Join,
            Self::Goodbye(_) => Opcode::Goodbye,
            Self::CreateGroup(_) => Opcode::CreateGroup,
            Self::JoinGroup(_) => Opcode::JoinGroup,
            Self::PublishContent(_) => Opcode::PublishContent,
            Self::AddComment(_) => Opcode::AddComment,
            Self::Backlog(_) => Opcode::Backlog,
            Self::RosterUpdate(_) => Opcode::RosterUpdate,
            Self::ParticipantJoined(_) => Opcode::ParticipantJoined,
            Self::ParticipantLeft(_) => Opcode::ParticipantLeft,
            Self::GroupNameList(_) => Opcode::GroupNameList,
            Self::GroupCreated(_) => Opcode::GroupCreated,
            Self::GroupFeed(_) => Opcode::GroupFeed,
            Self::GroupJoinerNotice(_) => Opcode::GroupJoinerNotice,
            Self::NewContent(_) => Opcode::NewContent,
            Self::NewComment(_) => Opcode::NewComment,
            Self::PublishAccepted(_) => Opcode::PublishAccepted,
            Self::Error(_) => Opcode::Error,
        }
    }

    /// Encode the inner struct to CBOR (no variant tag).
    ///
    /// Does not enforce [`FrameHeader::MAX_PAYLOAD_SIZE`]; that happens in
    /// [`Frame::encode`].
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let mut writer = dst.writer();

        match self {
            Self::Join(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Goodbye(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::CreateGroup(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::JoinGroup(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::PublishContent(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::AddComment(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Backlog(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::RosterUpdate(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::ParticipantJoined(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::ParticipantLeft(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::GroupNameList(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::GroupCreated(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::GroupFeed(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::GroupJoinerNotice(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::NewContent(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::NewComment(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::PublishAccepted(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Error(inner) => ciborium::ser::into_writer(inner, &mut writer),
        }
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))
    }

    /// Decode a payload according to `opcode`.
    ///
    /// The size check runs before CBOR parsing. An empty `Goodbye` payload is
    /// accepted as a goodbye without a reason.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if bytes exceed the protocol maximum
    /// - `ProtocolError::CborDecode` if CBOR deserialization fails
    pub fn decode(opcode: Opcode, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: bytes.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        let payload = match opcode {
            Opcode::Join => Self::Join(decode_cbor(bytes)?),
            Opcode::Goodbye if bytes.is_empty() => Self::Goodbye(session::Goodbye::default()),
            Opcode::Goodbye => Self::Goodbye(decode_cbor(bytes)?),
            Opcode::CreateGroup => Self::CreateGroup(decode_cbor(bytes)?),
            Opcode::JoinGroup => Self::JoinGroup(decode_cbor(bytes)?),
            Opcode::PublishContent => Self::PublishContent(decode_cbor(bytes)?),
            Opcode::AddComment => Self::AddComment(decode_cbor(bytes)?),
            Opcode::Backlog => Self::Backlog(decode_cbor(bytes)?),
            Opcode::RosterUpdate => Self::RosterUpdate(decode_cbor(bytes)?),
            Opcode::ParticipantJoined => Self::ParticipantJoined(decode_cbor(bytes)?),
            Opcode::ParticipantLeft => Self::ParticipantLeft(decode_cbor(bytes)?),
            Opcode::GroupNameList => Self::GroupNameList(decode_cbor(bytes)?),
            Opcode::GroupCreated => Self::GroupCreated(decode_cbor(bytes)?),
            Opcode::GroupFeed => Self::GroupFeed(decode_cbor(bytes)?),
            Opcode::GroupJoinerNotice => Self::GroupJoinerNotice(decode_cbor(bytes)?),
            Opcode::NewContent => Self::NewContent(decode_cbor(bytes)?),
            Opcode::NewComment => Self::NewComment(decode_cbor(bytes)?),
            Opcode::PublishAccepted => Self::PublishAccepted(decode_cbor(bytes)?),
            Opcode::Error => Self::Error(decode_cbor(bytes)?),
        };

        Ok(payload)
    }

    /// Encode into a frame, stamping the opcode into `header`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn into_frame(self, mut header: FrameHeader) -> Result<Frame> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        header.opcode = self.opcode().to_u16().to_be_bytes();
        Ok(Frame::new(header, buf))
    }

    /// Encode into a fresh frame carrying `request_id`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn into_frame_for(self, request_id: u32) -> Result<Frame> {
        let mut header = FrameHeader::new(self.opcode());
        header.set_request_id(request_id);
        self.into_frame(header)
    }

    /// Parse the payload of a frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownOpcode` if the opcode is not recognized
    /// - Any error from [`Payload::decode`]
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let opcode = frame
            .header
            .opcode_enum()
            .ok_or_else(|| ProtocolError::UnknownOpcode(frame.header.opcode()))?;
        Self::decode(opcode, &frame.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        content::{AssetUpload, Comment, ContentId, ContentItem, PublishContent, Scope},
        group::{CreateGroup, GroupFeed},
        session::{Goodbye, Join},
        *,
    };

    fn round_trip(payload: Payload) {
        let frame = payload.clone().into_frame_for(7).expect("should create frame");
        assert_eq!(frame.header.request_id(), 7);
        assert_eq!(frame.opcode(), Some(payload.opcode()));

        let decoded = Payload::from_frame(&frame).expect("should parse payload");
        assert_eq!(payload, decoded);
    }

    #[test]
    fn join_round_trip() {
        round_trip(Payload::Join(Join { display_name: "ada".to_string() }));
    }

    #[test]
    fn error_round_trip() {
        round_trip(Payload::Error(ErrorPayload::conflict("Group already exists")));
    }

    #[test]
    fn group_feed_round_trip() {
        let item = ContentItem {
            id: ContentId(1_700_000_000_000),
            author: "ada".to_string(),
            scope: Scope::Group("Friends".to_string()),
            caption: None,
            asset_ref: "/uploads/1700000000000-1.png".to_string(),
            created_at_ms: 1_700_000_000_000,
            comments: vec![Comment {
                author: "bob".to_string(),
                text: "nice".to_string(),
                created_at_ms: 1_700_000_000_500,
            }],
        };
        round_trip(Payload::GroupFeed(GroupFeed { name: "Friends".to_string(), items: vec![item] }));
    }

    #[test]
    fn publish_round_trip_keeps_bytes() {
        round_trip(Payload::PublishContent(PublishContent {
            scope: Scope::Global,
            caption: Some("sunset".to_string()),
            asset: AssetUpload {
                file_name: "sunset.jpg".to_string(),
                mime_type: "image/jpeg".to_string(),
                bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 1, 2],
            },
        }));
    }

    #[test]
    fn empty_goodbye_decodes() {
        let decoded = Payload::decode(Opcode::Goodbye, &[]).expect("should decode");
        assert_eq!(decoded, Payload::Goodbye(Goodbye::default()));
    }

    #[test]
    fn mismatched_opcode_fails() {
        let frame = Payload::CreateGroup(CreateGroup { name: "Work".to_string() })
            .into_frame_for(0)
            .expect("should create frame");

        let result = Payload::decode(Opcode::AddComment, &frame.payload);
        assert!(matches!(result, Err(ProtocolError::CborDecode(_))));
    }

    #[test]
    fn unknown_opcode_is_reported() {
        let mut frame = Frame::new(FrameHeader::new(Opcode::Join), Vec::new());
        frame.header.opcode = 0x7777u16.to_be_bytes();

        assert_eq!(Payload::from_frame(&frame), Err(ProtocolError::UnknownOpcode(0x7777)));
    }
}
