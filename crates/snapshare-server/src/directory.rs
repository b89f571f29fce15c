//! Membership directory: who is connected and which groups they joined.
//!
//! Maps each joined connection to its participant record (display name plus
//! group subscriptions) and remembers join order so roster snapshots are
//! stable. Group names stored here are non-owning back-references into the
//! group registry's keys; removing a participant returns them so the caller
//! can clean up the registry side.

use std::collections::{BTreeSet, HashMap};

use snapshare_proto::payloads::session::RosterEntry;
use thiserror::Error;

/// Directory errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The connection already has a participant record
    #[error("connection {0} is already registered")]
    DuplicateConnection(u64),

    /// No participant record for this connection
    #[error("connection {0} is not registered")]
    NotFound(u64),
}

/// A joined participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Display name supplied at join time
    pub display_name: String,
    /// Groups this participant has joined
    pub groups: BTreeSet<String>,
}

impl Participant {
    fn new(display_name: String) -> Self {
        Self { display_name, groups: BTreeSet::new() }
    }
}

/// Directory of joined participants.
#[derive(Debug, Default)]
pub struct MembershipDirectory {
    /// Session ID → participant
    participants: HashMap<u64, Participant>,
    /// Session IDs in join order
    join_order: Vec<u64>,
}

impl MembershipDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant for `session_id` with no subscriptions.
    ///
    /// # Errors
    ///
    /// - `DirectoryError::DuplicateConnection` if the connection is already
    ///   registered
    pub fn register(&mut self, session_id: u64, display_name: String) -> Result<(), DirectoryError> {
        if self.participants.contains_key(&session_id) {
            return Err(DirectoryError::DuplicateConnection(session_id));
        }

        self.participants.insert(session_id, Participant::new(display_name));
        self.join_order.push(session_id);
        Ok(())
    }

    /// Remove and return the participant record for `session_id`.
    ///
    /// # Errors
    ///
    /// - `DirectoryError::NotFound` if the connection is not registered
    pub fn unregister(&mut self, session_id: u64) -> Result<Participant, DirectoryError> {
        let participant =
            self.participants.remove(&session_id).ok_or(DirectoryError::NotFound(session_id))?;
        self.join_order.retain(|id| *id != session_id);
        Ok(participant)
    }

    /// Add `group` to the participant's subscriptions.
    ///
    /// Returns `true` if it was newly added, `false` if already subscribed.
    ///
    /// # Errors
    ///
    /// - `DirectoryError::NotFound` if the connection is not registered
    pub fn subscribe(&mut self, session_id: u64, group: &str) -> Result<bool, DirectoryError> {
        let participant =
            self.participants.get_mut(&session_id).ok_or(DirectoryError::NotFound(session_id))?;
        Ok(participant.groups.insert(group.to_string()))
    }

    /// Roster in join order.
    pub fn snapshot(&self) -> Vec<RosterEntry> {
        self.join_order
            .iter()
            .filter_map(|id| {
                self.participants.get(id).map(|p| RosterEntry {
                    session_id: *id,
                    display_name: p.display_name.clone(),
                })
            })
            .collect()
    }

    /// Session IDs in join order.
    ///
    /// Collected into a `Vec` so the result is a snapshot, not a live view.
    pub fn session_ids(&self) -> Vec<u64> {
        self.join_order.clone()
    }

    /// Participant record. `None` if not registered.
    pub fn participant(&self, session_id: u64) -> Option<&Participant> {
        self.participants.get(&session_id)
    }

    /// Display name. `None` if not registered.
    pub fn display_name(&self, session_id: u64) -> Option<&str> {
        self.participants.get(&session_id).map(|p| p.display_name.as_str())
    }

    /// Whether a participant exists for `session_id`.
    pub fn has_participant(&self, session_id: u64) -> bool {
        self.participants.contains_key(&session_id)
    }

    /// Groups a participant has joined (sorted). Empty if not registered.
    pub fn groups_for(&self, session_id: u64) -> impl Iterator<Item = &str> + '_ {
        self.participants.get(&session_id).into_iter().flat_map(|p| p.groups.iter().map(String::as_str))
    }

    /// Number of joined participants.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }
}
