//! Append-only content store.
//!
//! Owns every published item and its comment thread. Items are never removed
//! and never change scope; comments are only appended.
//!
//! Group feeds are indices into the item log, keyed by group name. A feed
//! exists only once the driver has opened it for a registered group, so an
//! item published to a name with no group is recorded but stays out of every
//! group feed, including one created later under that name.

use std::collections::HashMap;

use snapshare_proto::payloads::content::{Comment, ContentId, ContentItem, Scope};
use thiserror::Error;

/// Content store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    /// No item with this identifier
    #[error("content not found: {0}")]
    NotFound(ContentId),
}

/// Fields of an item that the caller supplies at publish time.
#[derive(Debug, Clone)]
pub struct NewContent {
    /// Publisher display name
    pub author: String,
    /// Target scope
    pub scope: Scope,
    /// Optional caption
    pub caption: Option<String>,
    /// Stored asset reference
    pub asset_ref: String,
}

/// In-memory record of all published content.
#[derive(Debug, Default)]
pub struct ContentStore {
    items: Vec<ContentItem>,
    by_id: HashMap<ContentId, usize>,
    group_feeds: HashMap<String, Vec<usize>>,
    last_id: u64,
}

impl ContentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start indexing items published to `group`.
    ///
    /// Returns `false` if the feed was already open.
    pub fn open_feed(&mut self, group: &str) -> bool {
        if self.group_feeds.contains_key(group) {
            return false;
        }
        self.group_feeds.insert(group.to_string(), Vec::new());
        true
    }

    /// Whether `group` has an open feed.
    pub fn has_feed(&self, group: &str) -> bool {
        self.group_feeds.contains_key(group)
    }

    // Saturates at `u64::MAX`: a clock pinned there repeats the last id
    // rather than overflowing.
    fn allocate_id(&mut self, now_ms: u64) -> ContentId {
        let id = now_ms.max(self.last_id.saturating_add(1));
        self.last_id = id;
        ContentId(id)
    }

    /// Record a new item and return a copy of it.
    ///
    /// The identifier is the wall-clock millisecond `now_ms`, bumped past the
    /// previous identifier when the clock has not advanced. Group-scoped items
    /// are appended to the group's feed if it is open.
    pub fn publish(&mut self, content: NewContent, now_ms: u64) -> ContentItem {
        let id = self.allocate_id(now_ms);
        let item = ContentItem {
            id,
            author: content.author,
            scope: content.scope,
            caption: content.caption,
            asset_ref: content.asset_ref,
            created_at_ms: now_ms,
            comments: Vec::new(),
        };

        let position = self.items.len();
        if let Some(feed) = item.scope.group().and_then(|g| self.group_feeds.get_mut(g)) {
            feed.push(position);
        }

        self.by_id.insert(id, position);
        self.items.push(item.clone());
        item
    }

    /// Append a comment to an item.
    ///
    /// # Errors
    ///
    /// - `ContentError::NotFound` if no item has this identifier
    pub fn add_comment(
        &mut self,
        content_id: ContentId,
        author: String,
        text: String,
        now_ms: u64,
    ) -> Result<Comment, ContentError> {
        let item = self
            .by_id
            .get(&content_id)
            .and_then(|&position| self.items.get_mut(position))
            .ok_or(ContentError::NotFound(content_id))?;

        let comment = Comment { author, text, created_at_ms: now_ms };
        item.comments.push(comment.clone());
        Ok(comment)
    }

    /// Items visible in `scope`, oldest first.
    ///
    /// `Global` yields exactly the globally scoped items. `Group(g)` yields the
    /// items indexed into g's feed, or nothing if the feed is not open.
    pub fn feed_for(&self, scope: &Scope) -> Vec<ContentItem> {
        match scope {
            Scope::Global => {
                self.items.iter().filter(|item| item.scope == Scope::Global).cloned().collect()
            },
            Scope::Group(group) => self
                .group_feeds
                .get(group)
                .into_iter()
                .flatten()
                .filter_map(|&position| self.items.get(position))
                .cloned()
                .collect(),
        }
    }

    /// Item by identifier.
    pub fn get(&self, content_id: ContentId) -> Option<&ContentItem> {
        self.by_id.get(&content_id).and_then(|&position| self.items.get(position))
    }

    /// Total number of items, including unindexed ones.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(author: &str, scope: Scope) -> NewContent {
        NewContent {
            author: author.to_string(),
            scope,
            caption: None,
            asset_ref: "/uploads/x.png".to_string(),
        }
    }

    fn group(name: &str) -> Scope {
        Scope::Group(name.to_string())
    }

    #[test]
    fn ids_are_unique_when_the_clock_stalls() {
        let mut store = ContentStore::new();

        let a = store.publish(photo("ada", Scope::Global), 1_000);
        let b = store.publish(photo("ada", Scope::Global), 1_000);
        let c = store.publish(photo("ada", Scope::Global), 999);
        let d = store.publish(photo("ada", Scope::Global), 5_000);

        assert_eq!(a.id, ContentId(1_000));
        assert_eq!(b.id, ContentId(1_001));
        assert_eq!(c.id, ContentId(1_002));
        assert_eq!(d.id, ContentId(5_000));
    }

    #[test]
    fn global_feed_excludes_group_items() {
        let mut store = ContentStore::new();
        store.open_feed("Friends");

        let first = store.publish(photo("ada", Scope::Global), 1);
        store.publish(photo("ada", group("Friends")), 2);
        let third = store.publish(photo("bob", Scope::Global), 3);

        let feed = store.feed_for(&Scope::Global);
        assert_eq!(feed.iter().map(|i| i.id).collect::<Vec<_>>(), vec![first.id, third.id]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn group_feed_only_holds_its_own_items() {
        let mut store = ContentStore::new();
        store.open_feed("Friends");
        store.open_feed("Work");

        let f = store.publish(photo("ada", group("Friends")), 1);
        store.publish(photo("ada", group("Work")), 2);

        let feed = store.feed_for(&group("Friends"));
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, f.id);
    }

    #[test]
    fn items_for_unknown_groups_stay_unindexed() {
        let mut store = ContentStore::new();

        let orphan = store.publish(photo("ada", group("Later")), 1);
        store.open_feed("Later");

        assert!(store.feed_for(&group("Later")).is_empty());
        assert_eq!(store.get(orphan.id).map(|i| i.scope.clone()), Some(group("Later")));
    }

    #[test]
    fn comments_append_in_order() {
        let mut store = ContentStore::new();
        let item = store.publish(photo("ada", Scope::Global), 1);

        store.add_comment(item.id, "bob".to_string(), "first".to_string(), 2).unwrap();
        let second = store.add_comment(item.id, "ada".to_string(), "second".to_string(), 3).unwrap();

        assert_eq!(second.author, "ada");
        let stored = store.get(item.id).unwrap();
        let texts: Vec<_> = stored.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(store.feed_for(&Scope::Global)[0].comments.len(), 2);
    }

    #[test]
    fn comment_on_unknown_item_fails() {
        let mut store = ContentStore::new();
        let result = store.add_comment(ContentId(42), "bob".to_string(), "hi".to_string(), 1);
        assert_eq!(result, Err(ContentError::NotFound(ContentId(42))));
    }

    #[test]
    fn open_feed_is_idempotent() {
        let mut store = ContentStore::new();
        assert!(store.open_feed("Friends"));
        assert!(!store.open_feed("Friends"));
        assert!(store.has_feed("Friends"));
    }

    #[test]
    fn saturated_clock_does_not_overflow_ids() {
        let mut store = ContentStore::new();

        let first = store.publish(photo("ada", Scope::Global), u64::MAX);
        let second = store.publish(photo("ada", Scope::Global), u64::MAX);

        assert_eq!(first.id, ContentId(u64::MAX));
        assert_eq!(second.id, ContentId(u64::MAX));
        assert_eq!(store.len(), 2);
    }
}
