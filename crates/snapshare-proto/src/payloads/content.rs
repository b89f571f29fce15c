//! Content payload types: photos, comments and their distribution scope.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a published content item.
///
/// Derived from the wall clock in Unix milliseconds at creation time and
/// strictly increasing for the life of the server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub u64);

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Audience of a content item.
///
/// `Global` reaches every joined participant. `Group` reaches the members of
/// one named group. The reserved name `"all"` is how `Global` is written in
/// human-facing text; it is never a valid group name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Everyone currently joined
    Global,
    /// Members of the named group
    Group(String),
}

impl Scope {
    /// Reserved display name of [`Scope::Global`].
    pub const GLOBAL_NAME: &'static str = "all";

    /// Interpret a human-facing scope name. `"all"` maps to [`Scope::Global`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name == Self::GLOBAL_NAME { Self::Global } else { Self::Group(name.to_string()) }
    }

    /// Human-facing name of this scope.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Global => Self::GLOBAL_NAME,
            Self::Group(name) => name,
        }
    }

    /// Group name, if this scope targets a group.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Group(name) => Some(name),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A comment attached to exactly one content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Author display name at the time of commenting
    pub author: String,
    /// Comment body
    pub text: String,
    /// Unix milliseconds
    pub created_at_ms: u64,
}

/// A published photo and its comment thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Unique identifier
    pub id: ContentId,
    /// Publisher display name captured at publish time
    pub author: String,
    /// Distribution scope (immutable)
    pub scope: Scope,
    /// Optional caption
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub caption: Option<String>,
    /// Reference to the stored asset, e.g. `/uploads/1700000000000-42.png`
    pub asset_ref: String,
    /// Unix milliseconds
    pub created_at_ms: u64,
    /// Comments in append order
    pub comments: Vec<Comment>,
}

/// Raw photo upload carried by [`PublishContent`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUpload {
    /// Client-side file name, used for the extension check
    pub file_name: String,
    /// Declared MIME type, e.g. `image/png`
    pub mime_type: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl fmt::Debug for AssetUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetUpload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Publish a photo to a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishContent {
    /// Target audience
    pub scope: Scope,
    /// Optional caption
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub caption: Option<String>,
    /// The photo itself
    pub asset: AssetUpload,
}

/// Append a comment to a published item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddComment {
    /// Item to comment on
    pub content_id: ContentId,
    /// Comment body
    pub text: String,
}

/// Global feed delivered to a participant right after joining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backlog {
    /// Items in publish order, oldest first
    pub items: Vec<ContentItem>,
}

/// A newly published item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContent {
    /// The item
    pub item: ContentItem,
}

/// A newly appended comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    /// Parent item
    pub content_id: ContentId,
    /// The comment
    pub comment: Comment,
}

/// Acknowledgement sent to the publisher once an upload has been stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishAccepted {
    /// Identifier allocated for the item
    pub content_id: ContentId,
    /// Where the asset was stored
    pub asset_ref: String,
}
