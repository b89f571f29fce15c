//! Operation codes.
//!
//! Client requests live in `0x0001..0x00FF`, server events in
//! `0x0100..0x01FF`. `Error` sits at the top of the request range so both
//! sides recognise it.

/// Frame operation code (big-endian `u16` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    /// Participant announces a display name
    Join = 0x0001,
    /// Graceful disconnect
    Goodbye = 0x0002,
    /// Create a named group
    CreateGroup = 0x0010,
    /// Join an existing group
    JoinGroup = 0x0011,
    /// Upload and publish a photo
    PublishContent = 0x0020,
    /// Comment on a published item
    AddComment = 0x0021,

    /// Global feed sent after join
    Backlog = 0x0100,
    /// Current participant list
    RosterUpdate = 0x0101,
    /// Someone joined
    ParticipantJoined = 0x0102,
    /// Someone left
    ParticipantLeft = 0x0103,
    /// Group names in creation order
    GroupNameList = 0x0110,
    /// A group was created
    GroupCreated = 0x0111,
    /// Group feed sent to a joiner
    GroupFeed = 0x0112,
    /// A participant joined a group
    GroupJoinerNotice = 0x0113,
    /// Newly published item
    NewContent = 0x0120,
    /// Newly appended comment
    NewComment = 0x0121,
    /// Acknowledgement sent to the publisher
    PublishAccepted = 0x0122,

    /// Error reply
    Error = 0x00FF,
}

impl Opcode {
    /// Every opcode, in wire order.
    pub const ALL: [Self; 18] = [
        Self::Join,
        Self::Goodbye,
        Self::CreateGroup,
        Self::JoinGroup,
        Self::PublishContent,
        Self::AddComment,
        Self::Error,
        Self::Backlog,
        Self::RosterUpdate,
        Self::ParticipantJoined,
        Self::ParticipantLeft,
        Self::GroupNameList,
        Self::GroupCreated,
        Self::GroupFeed,
        Self::GroupJoinerNotice,
        Self::NewContent,
        Self::NewComment,
        Self::PublishAccepted,
    ];

    /// Raw wire value.
    #[must_use]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Parse a wire value. `None` if unrecognized.
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::Join),
            0x0002 => Some(Self::Goodbye),
            0x0010 => Some(Self::CreateGroup),
            0x0011 => Some(Self::JoinGroup),
            0x0020 => Some(Self::PublishContent),
            0x0021 => Some(Self::AddComment),
            0x0100 => Some(Self::Backlog),
            0x0101 => Some(Self::RosterUpdate),
            0x0102 => Some(Self::ParticipantJoined),
            0x0103 => Some(Self::ParticipantLeft),
            0x0110 => Some(Self::GroupNameList),
            0x0111 => Some(Self::GroupCreated),
            0x0112 => Some(Self::GroupFeed),
            0x0113 => Some(Self::GroupJoinerNotice),
            0x0120 => Some(Self::NewContent),
            0x0121 => Some(Self::NewComment),
            0x0122 => Some(Self::PublishAccepted),
            0x00FF => Some(Self::Error),
            _ => None,
        }
    }

    /// Whether clients may send this opcode to the server.
    #[must_use]
    pub const fn is_client_request(self) -> bool {
        matches!(
            self,
            Self::Join
                | Self::Goodbye
                | Self::CreateGroup
                | Self::JoinGroup
                | Self::PublishContent
                | Self::AddComment
        )
    }
}
