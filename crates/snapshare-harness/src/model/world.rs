//! Model world: the oracle the real driver is checked against.

use std::collections::BTreeSet;

use super::operation::{
    ClientId, EventKind, GROUP_NAMES, GroupSlot, Operation, OperationResult, Outcome, Rejection,
    Target, group_name,
};

/// Observable state for oracle comparison.
///
/// Items are identified by their publish index (0 for the first item ever
/// published), since real identifiers depend on the clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Joined clients in join order.
    pub roster: Vec<ClientId>,
    /// Groups in creation order with their members.
    pub groups: Vec<(String, BTreeSet<ClientId>)>,
    /// Global feed.
    pub global_feed: Vec<usize>,
    /// Feed of each group, in creation order.
    pub group_feeds: Vec<(String, Vec<usize>)>,
    /// Number of comments on each item.
    pub comment_counts: Vec<usize>,
}

#[derive(Debug, Clone)]
struct ModelGroup {
    name: &'static str,
    members: BTreeSet<ClientId>,
    feed: Vec<usize>,
}

#[derive(Debug, Clone)]
struct ModelItem {
    global: bool,
    comments: usize,
}

/// Model world - the reference implementation.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    num_clients: usize,
    /// Joined clients in join order
    roster: Vec<ClientId>,
    /// Groups in creation order
    groups: Vec<ModelGroup>,
    /// Every item ever published
    items: Vec<ModelItem>,
}

impl ModelWorld {
    /// World with `num_clients` offline clients and the default seed groups.
    pub fn new(num_clients: usize) -> Self {
        Self::with_seeds(num_clients, &GROUP_NAMES[..3])
    }

    /// World with explicit seed groups.
    pub fn with_seeds(num_clients: usize, seeds: &[&'static str]) -> Self {
        let groups = seeds
            .iter()
            .map(|&name| ModelGroup { name, members: BTreeSet::new(), feed: Vec::new() })
            .collect();

        Self { num_clients, roster: Vec::new(), groups, items: Vec::new() }
    }

    /// Number of clients in the world.
    pub fn num_clients(&self) -> usize {
        self.num_clients
    }

    /// Whether `client_id` is joined.
    pub fn is_joined(&self, client_id: ClientId) -> bool {
        self.roster.contains(&client_id)
    }

    /// Number of items published so far.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Apply an operation and return who should see what.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        let client_id = op.client_id();
        match op {
            Operation::Join { .. } => self.apply_join(client_id),
            _ if !self.is_joined(client_id) => OperationResult::silent(Outcome::Skipped),
            Operation::CreateGroup { group, .. } => self.apply_create_group(client_id, *group),
            Operation::JoinGroup { group, .. } => self.apply_join_group(client_id, *group),
            Operation::Publish { target, .. } => self.apply_publish(client_id, *target),
            Operation::Comment { item, .. } => self.apply_comment(*item),
            Operation::Disconnect { .. } => self.apply_disconnect(client_id),
        }
    }

    fn others(&self, client_id: ClientId) -> impl Iterator<Item = ClientId> + '_ {
        self.roster.iter().copied().filter(move |c| *c != client_id)
    }

    fn group_mut(&mut self, name: &str) -> Option<&mut ModelGroup> {
        self.groups.iter_mut().find(|g| g.name == name)
    }

    fn apply_join(&mut self, client_id: ClientId) -> OperationResult {
        if self.is_joined(client_id) {
            let mut result = OperationResult::silent(Outcome::Rejected(Rejection::Validation));
            result.deliver(EventKind::Error, [client_id]);
            return result;
        }

        self.roster.push(client_id);

        let mut result = OperationResult::silent(Outcome::Applied);
        result.deliver(EventKind::Backlog, [client_id]);
        result.deliver(EventKind::GroupNameList, [client_id]);
        result.deliver(EventKind::RosterUpdate, self.roster.iter().copied());
        result.deliver(EventKind::ParticipantJoined, self.others(client_id));
        result
    }

    fn apply_create_group(&mut self, client_id: ClientId, slot: GroupSlot) -> OperationResult {
        let name = group_name(slot);
        if self.group_mut(name).is_some() {
            let mut result = OperationResult::silent(Outcome::Rejected(Rejection::Conflict));
            result.deliver(EventKind::Error, [client_id]);
            return result;
        }

        self.groups.push(ModelGroup {
            name,
            members: BTreeSet::from([client_id]),
            feed: Vec::new(),
        });

        let mut result = OperationResult::silent(Outcome::Applied);
        result.deliver(EventKind::GroupCreated, self.roster.iter().copied());
        result.deliver(EventKind::GroupNameList, self.roster.iter().copied());
        result
    }

    fn apply_join_group(&mut self, client_id: ClientId, slot: GroupSlot) -> OperationResult {
        let Some(group) = self.group_mut(group_name(slot)) else {
            return OperationResult::silent(Outcome::Ignored);
        };

        let existing: Vec<ClientId> = group.members.iter().copied().collect();
        let newly_added = group.members.insert(client_id);

        let mut result = OperationResult::silent(Outcome::Applied);
        result.deliver(EventKind::GroupFeed, [client_id]);
        if newly_added {
            result.deliver(EventKind::GroupJoinerNotice, existing);
        }
        result
    }

    fn apply_publish(&mut self, client_id: ClientId, target: Target) -> OperationResult {
        let index = self.items.len();
        let audience: Vec<ClientId> = match target {
            Target::Global => self.roster.clone(),
            Target::Group(slot) => match self.group_mut(group_name(slot)) {
                Some(group) => {
                    group.feed.push(index);
                    group.members.iter().copied().collect()
                },
                None => Vec::new(),
            },
        };
        self.items.push(ModelItem { global: target == Target::Global, comments: 0 });

        let mut result = OperationResult::silent(Outcome::Applied);
        result.deliver(EventKind::PublishAccepted, [client_id]);
        result.deliver(EventKind::NewContent, audience);
        result
    }

    fn apply_comment(&mut self, item: u8) -> OperationResult {
        if self.items.is_empty() {
            return OperationResult::silent(Outcome::Ignored);
        }
        let count = self.items.len();
        self.items[item as usize % count].comments += 1;

        let mut result = OperationResult::silent(Outcome::Applied);
        result.deliver(EventKind::NewComment, self.roster.iter().copied());
        result
    }

    fn apply_disconnect(&mut self, client_id: ClientId) -> OperationResult {
        self.roster.retain(|c| *c != client_id);
        for group in &mut self.groups {
            group.members.remove(&client_id);
        }

        let mut result = OperationResult::silent(Outcome::Applied);
        result.deliver(EventKind::ParticipantLeft, self.roster.iter().copied());
        result.deliver(EventKind::RosterUpdate, self.roster.iter().copied());
        result
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            roster: self.roster.clone(),
            groups: self.groups.iter().map(|g| (g.name.to_string(), g.members.clone())).collect(),
            global_feed: (0..self.items.len()).filter(|i| self.items[*i].global).collect(),
            group_feeds: self.groups.iter().map(|g| (g.name.to_string(), g.feed.clone())).collect(),
            comment_counts: self.items.iter().map(|item| item.comments).collect(),
        }
    }
}
