//! Group payload types.

use serde::{Deserialize, Serialize};

use super::content::ContentItem;

/// Create a group. The creator becomes its first member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGroup {
    /// Group name (case-sensitive, `"all"` is reserved)
    pub name: String,
}

/// Join an existing group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGroup {
    /// Group name
    pub name: String,
}

/// All group names in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupNameList {
    /// Group names
    pub names: Vec<String>,
}

/// A group was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCreated {
    /// Group name
    pub name: String,
    /// Creator display name
    pub creator: String,
}

/// Feed of a group, sent to a participant who just joined it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFeed {
    /// Group name
    pub name: String,
    /// Items in publish order, oldest first
    pub items: Vec<ContentItem>,
}

/// Sent to existing group members when someone joins the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupJoinerNotice {
    /// Group name
    pub group: String,
    /// Display name of the joiner
    pub display_name: String,
}
