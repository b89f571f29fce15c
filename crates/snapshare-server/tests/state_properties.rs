//! Property-based tests for the engine's state components
//!
//! Directory, group registry and content store invariants that must hold for
//! all operation sequences.

use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;
use snapshare_proto::payloads::content::Scope;
use snapshare_server::{
    ContentStore, GroupError, GroupRegistry, MembershipDirectory, content_store::NewContent,
};

const GROUPS: [&str; 3] = ["Friends", "Family", "Work"];

fn scope_strategy() -> impl Strategy<Value = Scope> {
    prop_oneof![
        Just(Scope::Global),
        (0..GROUPS.len()).prop_map(|i| Scope::Group(GROUPS[i].to_string())),
        Just(Scope::Group("Unregistered".to_string())),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: group membership behaves like a set no matter how often a
    /// session joins
    #[test]
    fn prop_join_is_set_insert(joins in prop::collection::vec((0..GROUPS.len(), 0u64..8), 0..64)) {
        let mut registry = GroupRegistry::with_seeds(GROUPS);
        let mut model: HashMap<&str, BTreeSet<u64>> = HashMap::new();

        for (group, session) in joins {
            let name = GROUPS[group];
            let newly = registry.join(name, session)?;
            prop_assert_eq!(newly, model.entry(name).or_default().insert(session));
        }

        for name in GROUPS {
            let expected: Vec<u64> = model.get(name).into_iter().flatten().copied().collect();
            prop_assert_eq!(registry.members(name)?, expected);
        }
    }

    /// Property: creating the same name from any number of sessions succeeds
    /// exactly once
    #[test]
    fn prop_create_succeeds_once(creators in prop::collection::vec(any::<u64>(), 1..10)) {
        let mut registry = GroupRegistry::new();

        let results: Vec<_> =
            creators.iter().map(|c| registry.create("X", *c, "someone", 0)).collect();

        prop_assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        prop_assert!(results[1..].iter().all(|r| matches!(r, Err(GroupError::AlreadyExists(_)))));
        prop_assert_eq!(registry.members("X")?, vec![creators[0]]);
    }

    /// Property: leave_all with a session's subscriptions removes it from
    /// every group and leaves other members alone
    #[test]
    fn prop_leave_all_clears_session(
        joins in prop::collection::vec((0..GROUPS.len(), 0u64..4), 1..32),
        leaver in 0u64..4,
    ) {
        let mut registry = GroupRegistry::with_seeds(GROUPS);
        let mut directory = MembershipDirectory::new();
        for session in 0u64..4 {
            directory.register(session, format!("p{session}"))?;
        }
        for (group, session) in &joins {
            registry.join(GROUPS[*group], *session)?;
            directory.subscribe(*session, GROUPS[*group])?;
        }
        let before: HashMap<&str, Vec<u64>> =
            GROUPS.iter().map(|g| (*g, registry.members(g).unwrap_or_default())).collect();

        let participant = directory.unregister(leaver)?;
        registry.leave_all(leaver, participant.groups.iter().map(String::as_str));

        for name in GROUPS {
            let expected: Vec<u64> =
                before[name].iter().copied().filter(|s| *s != leaver).collect();
            prop_assert_eq!(registry.members(name)?, expected);
        }
    }

    /// Property: the roster lists remaining participants in join order
    #[test]
    fn prop_roster_keeps_join_order(
        sessions in prop::collection::btree_set(any::<u64>(), 1..16),
        leave_mask in any::<u16>(),
    ) {
        let mut directory = MembershipDirectory::new();
        let order: Vec<u64> = sessions.into_iter().rev().collect();
        for id in &order {
            directory.register(*id, id.to_string())?;
        }

        let mut remaining = Vec::new();
        for (i, id) in order.iter().enumerate() {
            if leave_mask & (1 << i) != 0 {
                directory.unregister(*id)?;
            } else {
                remaining.push(*id);
            }
        }

        let roster: Vec<u64> = directory.snapshot().into_iter().map(|e| e.session_id).collect();
        prop_assert_eq!(&roster, &remaining);
        prop_assert_eq!(directory.session_ids(), remaining);
    }

    /// Property: feeds partition published items by scope and keep publish
    /// order; identifiers stay unique even when the clock misbehaves
    #[test]
    fn prop_feeds_follow_scope(
        publishes in prop::collection::vec((scope_strategy(), 0u64..50), 0..40),
    ) {
        let mut store = ContentStore::new();
        for name in GROUPS {
            store.open_feed(name);
        }

        let mut published = Vec::new();
        for (scope, now_ms) in publishes {
            let item = store.publish(
                NewContent {
                    author: "ada".to_string(),
                    scope,
                    caption: None,
                    asset_ref: "/uploads/a.png".to_string(),
                },
                now_ms,
            );
            published.push(item);
        }

        let ids: Vec<u64> = published.iter().map(|i| i.id.0).collect();
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));

        let expected = |scope: &Scope| -> Vec<u64> {
            published.iter().filter(|i| &i.scope == scope).map(|i| i.id.0).collect()
        };
        let actual = |scope: &Scope| -> Vec<u64> {
            store.feed_for(scope).into_iter().map(|i| i.id.0).collect()
        };

        prop_assert_eq!(actual(&Scope::Global), expected(&Scope::Global));
        for name in GROUPS {
            let scope = Scope::Group(name.to_string());
            prop_assert_eq!(actual(&scope), expected(&scope));
        }
        prop_assert!(actual(&Scope::Group("Unregistered".to_string())).is_empty());
        prop_assert_eq!(store.len(), published.len());
    }
}
