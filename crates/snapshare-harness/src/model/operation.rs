//! Operations for model-based testing.
//!
//! Operations represent all possible client actions. They are generated
//! randomly by proptest (or derived from fuzz input through `Arbitrary`) and
//! applied to both the model and the real driver.

use std::collections::{BTreeMap, BTreeSet};

use arbitrary::Arbitrary;

/// Client identifier (0-indexed).
pub type ClientId = u8;

/// Index into [`GROUP_NAMES`] (taken modulo its length).
pub type GroupSlot = u8;

/// Group names operations can refer to. The first three are the default seed
/// groups; the rest only exist once someone creates them.
pub const GROUP_NAMES: [&str; 5] = ["Friends", "Family", "Work", "Climbing", "Chess"];

/// Operations that can be applied to the system.
///
/// A client that is not joined is offline: it has no connection, and every
/// operation except [`Operation::Join`] is skipped for it.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Connect (if needed) and join the session.
    Join {
        /// Client joining.
        client_id: ClientId,
    },

    /// Create a group.
    CreateGroup {
        /// Creator.
        client_id: ClientId,
        /// Group to create.
        group: GroupSlot,
    },

    /// Join a group.
    JoinGroup {
        /// Client joining.
        client_id: ClientId,
        /// Group to join.
        group: GroupSlot,
    },

    /// Publish a photo.
    Publish {
        /// Publisher.
        client_id: ClientId,
        /// Audience.
        target: Target,
    },

    /// Comment on a previously published item.
    Comment {
        /// Commenter.
        client_id: ClientId,
        /// Index into the items published so far (taken modulo their count).
        item: u8,
    },

    /// Drop the connection.
    Disconnect {
        /// Client disconnecting.
        client_id: ClientId,
    },
}

impl Operation {
    /// Client performing the operation.
    pub fn client_id(&self) -> ClientId {
        match self {
            Self::Join { client_id }
            | Self::CreateGroup { client_id, .. }
            | Self::JoinGroup { client_id, .. }
            | Self::Publish { client_id, .. }
            | Self::Comment { client_id, .. }
            | Self::Disconnect { client_id } => *client_id,
        }
    }

    /// Same operation performed by `client_id`.
    #[must_use]
    pub fn with_client(mut self, client_id: ClientId) -> Self {
        match &mut self {
            Self::Join { client_id: c }
            | Self::CreateGroup { client_id: c, .. }
            | Self::JoinGroup { client_id: c, .. }
            | Self::Publish { client_id: c, .. }
            | Self::Comment { client_id: c, .. }
            | Self::Disconnect { client_id: c } => *c = client_id,
        }
        self
    }
}

/// Audience of a model publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Target {
    /// Everyone joined
    Global,
    /// One group, possibly not created yet
    Group(GroupSlot),
}

/// Resolve a slot to its group name.
pub(crate) fn group_name(slot: GroupSlot) -> &'static str {
    GROUP_NAMES[slot as usize % GROUP_NAMES.len()]
}

/// Server event kinds, one per server-to-client opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// Global feed after joining
    Backlog,
    /// Full roster
    RosterUpdate,
    /// Someone joined
    ParticipantJoined,
    /// Someone left
    ParticipantLeft,
    /// Group names
    GroupNameList,
    /// Group created
    GroupCreated,
    /// Feed of a group just joined
    GroupFeed,
    /// Someone joined one of your groups
    GroupJoinerNotice,
    /// New item
    NewContent,
    /// New comment
    NewComment,
    /// Upload acknowledged
    PublishAccepted,
    /// Error reply
    Error,
}

/// Why the engine refused an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Invalid in the current state (e.g. joining twice)
    Validation,
    /// Group name taken
    Conflict,
}

/// How an operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Applied
    Applied,
    /// Refused with an error reply
    Rejected(Rejection),
    /// Dropped without a reply (unknown group or item)
    Ignored,
    /// Not attempted: the client is offline
    Skipped,
}

/// Result of applying an operation: the outcome plus who receives what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    /// How the operation ended
    pub outcome: Outcome,
    /// Recipients per event kind. Kinds nobody receives are absent.
    pub deliveries: BTreeMap<EventKind, BTreeSet<ClientId>>,
}

impl OperationResult {
    /// An outcome with no deliveries.
    pub fn silent(outcome: Outcome) -> Self {
        Self { outcome, deliveries: BTreeMap::new() }
    }

    /// Record that `recipients` receive `kind`. Empty sets are not recorded.
    pub fn deliver(&mut self, kind: EventKind, recipients: impl IntoIterator<Item = ClientId>) {
        let recipients: BTreeSet<_> = recipients.into_iter().collect();
        if !recipients.is_empty() {
            self.deliveries.entry(kind).or_default().extend(recipients);
        }
    }

    /// Whether the operation was applied.
    pub fn is_applied(&self) -> bool {
        self.outcome == Outcome::Applied
    }
}
