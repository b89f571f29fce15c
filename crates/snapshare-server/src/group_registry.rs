//! Group registry.
//!
//! Single flat namespace of named groups. Groups are created explicitly by a
//! participant or seeded at startup, never created lazily by a join, and never
//! deleted. The name `"all"` is reserved for the global scope.
//!
//! Member sets hold session IDs only. The registry trusts the driver to keep
//! them a subset of the membership directory: every member removal goes
//! through [`GroupRegistry::leave_all`] when a participant disconnects.

use std::collections::{BTreeSet, HashMap};

use snapshare_proto::payloads::content::Scope;

/// Metadata about a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMetadata {
    /// Display name of the creator. `None` for seeded groups.
    pub creator: Option<String>,
    /// Unix milliseconds. Zero for seeded groups.
    pub created_at_ms: u64,
}

#[derive(Debug)]
struct Group {
    members: BTreeSet<u64>,
    metadata: GroupMetadata,
}

/// Errors from group registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupError {
    /// Group does not exist
    #[error("Group not found: {0}")]
    NotFound(String),

    /// Group already exists
    #[error("Group already exists: {0}")]
    AlreadyExists(String),

    /// Name is reserved for the global scope
    #[error("Group name is reserved: {0}")]
    Reserved(String),
}

/// Named groups, their members and metadata.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: HashMap<String, Group>,
    /// Names in creation order
    order: Vec<String>,
}

impl GroupRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-seeded with `names`. Duplicates and the
    /// reserved name are skipped.
    pub fn with_seeds<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut registry = Self::new();
        for name in names {
            registry.seed(name);
        }
        registry
    }

    /// Add a group with no creator and no members.
    ///
    /// Returns `true` if the group was added, `false` if it already existed or
    /// the name is reserved.
    pub fn seed(&mut self, name: &str) -> bool {
        if name == Scope::GLOBAL_NAME || self.has_group(name) {
            return false;
        }

        self.insert(name, BTreeSet::new(), GroupMetadata { creator: None, created_at_ms: 0 });
        true
    }

    /// Create a group with `creator` as its first member.
    ///
    /// # Errors
    ///
    /// - `GroupError::Reserved` if `name` is the global scope name
    /// - `GroupError::AlreadyExists` if the name is taken
    pub fn create(
        &mut self,
        name: &str,
        creator: u64,
        creator_name: &str,
        created_at_ms: u64,
    ) -> Result<(), GroupError> {
        if name == Scope::GLOBAL_NAME {
            return Err(GroupError::Reserved(name.to_string()));
        }

        if self.has_group(name) {
            return Err(GroupError::AlreadyExists(name.to_string()));
        }

        let metadata = GroupMetadata { creator: Some(creator_name.to_string()), created_at_ms };
        self.insert(name, BTreeSet::from([creator]), metadata);
        Ok(())
    }

    fn insert(&mut self, name: &str, members: BTreeSet<u64>, metadata: GroupMetadata) {
        self.groups.insert(name.to_string(), Group { members, metadata });
        self.order.push(name.to_string());
    }

    /// Add `session_id` to a group.
    ///
    /// Returns `true` if newly added, `false` if it was already a member.
    ///
    /// # Errors
    ///
    /// - `GroupError::NotFound` if the group does not exist
    pub fn join(&mut self, name: &str, session_id: u64) -> Result<bool, GroupError> {
        let group =
            self.groups.get_mut(name).ok_or_else(|| GroupError::NotFound(name.to_string()))?;
        Ok(group.members.insert(session_id))
    }

    /// Remove `session_id` from each named group. Missing groups are ignored.
    ///
    /// Returns the number of groups the session was actually removed from.
    pub fn leave_all<'a>(
        &mut self,
        session_id: u64,
        names: impl IntoIterator<Item = &'a str>,
    ) -> usize {
        names
            .into_iter()
            .filter(|name| {
                self.groups.get_mut(*name).is_some_and(|g| g.members.remove(&session_id))
            })
            .count()
    }

    /// Snapshot of a group's members (ascending session ID).
    ///
    /// # Errors
    ///
    /// - `GroupError::NotFound` if the group does not exist
    pub fn members(&self, name: &str) -> Result<Vec<u64>, GroupError> {
        self.groups
            .get(name)
            .map(|g| g.members.iter().copied().collect())
            .ok_or_else(|| GroupError::NotFound(name.to_string()))
    }

    /// Whether `session_id` belongs to the group.
    pub fn is_member(&self, name: &str, session_id: u64) -> bool {
        self.groups.get(name).is_some_and(|g| g.members.contains(&session_id))
    }

    /// Whether a group exists.
    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Group metadata. `None` if the group does not exist.
    pub fn metadata(&self, name: &str) -> Option<&GroupMetadata> {
        self.groups.get(name).map(|g| &g.metadata)
    }

    /// Group names in creation order.
    pub fn list_names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Number of groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_adds_creator_as_member() {
        let mut registry = GroupRegistry::new();

        registry.create("Friends", 1, "ada", 1_000).unwrap();

        assert_eq!(registry.members("Friends").unwrap(), vec![1]);
        let metadata = registry.metadata("Friends").unwrap();
        assert_eq!(metadata.creator.as_deref(), Some("ada"));
        assert_eq!(metadata.created_at_ms, 1_000);
    }

    #[test]
    fn create_duplicate_fails_without_mutation() {
        let mut registry = GroupRegistry::new();
        registry.create("Friends", 1, "ada", 0).unwrap();

        let result = registry.create("Friends", 2, "bob", 0);

        assert_eq!(result, Err(GroupError::AlreadyExists("Friends".to_string())));
        assert_eq!(registry.members("Friends").unwrap(), vec![1]);
        assert_eq!(registry.list_names(), vec!["Friends".to_string()]);
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut registry = GroupRegistry::new();
        registry.create("friends", 1, "ada", 0).unwrap();
        registry.create("Friends", 2, "bob", 0).unwrap();

        assert_eq!(registry.group_count(), 2);
    }

    #[test]
    fn global_name_is_reserved() {
        let mut registry = GroupRegistry::new();

        assert_eq!(registry.create("all", 1, "ada", 0), Err(GroupError::Reserved("all".to_string())));
        assert!(!registry.seed("all"));
        assert!(!registry.has_group("all"));
    }

    #[test]
    fn join_unknown_group_fails() {
        let mut registry = GroupRegistry::new();
        assert_eq!(registry.join("Nope", 1), Err(GroupError::NotFound("Nope".to_string())));
        assert!(!registry.has_group("Nope"));
    }

    #[test]
    fn join_is_idempotent() {
        let mut registry = GroupRegistry::with_seeds(["Work"]);

        assert_eq!(registry.join("Work", 5), Ok(true));
        assert_eq!(registry.join("Work", 5), Ok(false));
        assert_eq!(registry.members("Work").unwrap(), vec![5]);
    }

    #[test]
    fn leave_all_ignores_missing_groups() {
        let mut registry = GroupRegistry::with_seeds(["Friends", "Family"]);
        registry.join("Friends", 1).unwrap();
        registry.join("Family", 1).unwrap();
        registry.join("Family", 2).unwrap();

        let removed = registry.leave_all(1, ["Friends", "Family", "Gone"]);

        assert_eq!(removed, 2);
        assert!(registry.members("Friends").unwrap().is_empty());
        assert_eq!(registry.members("Family").unwrap(), vec![2]);
    }

    #[test]
    fn seeds_keep_creation_order_and_skip_duplicates() {
        let mut registry = GroupRegistry::with_seeds(["Friends", "Family", "Work", "Family"]);
        registry.create("Climbing", 1, "ada", 0).unwrap();

        assert_eq!(registry.list_names(), vec!["Friends", "Family", "Work", "Climbing"]);
        assert_eq!(registry.metadata("Work").unwrap().creator, None);
    }
}
