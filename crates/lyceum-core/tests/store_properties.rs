//! Property-based tests for the message store.
//!
//! These verify the ordering and uniqueness invariants for all input
//! shapes: display order equals apply order, regardless of when profile
//! lookups complete, and no message is duplicated or dropped.

use lyceum_core::{Message, MessageStore, Profile, ProfileCache};
use proptest::prelude::*;

fn row(id: u128, room_id: u128, sender_id: u64, created_at: u64) -> Message {
    Message {
        id,
        room_id,
        sender_id,
        body: format!("m{id}"),
        created_at,
        read_by: vec![sender_id],
    }
}

fn profile(user_id: u64) -> Profile {
    Profile { user_id, full_name: None, email: format!("u{user_id}@x.com") }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: final in-memory order equals the order inserts were
    /// applied, independent of profile-attachment order.
    #[test]
    fn prop_insert_order_is_display_order(
        senders in prop::collection::vec(1u64..8, 1..40),
        attach_order in prop::collection::vec(1u64..8, 0..8),
    ) {
        let mut store = MessageStore::new();
        let cache = ProfileCache::new();
        store.load_history(1, Vec::new(), &cache);

        for (i, &sender) in senders.iter().enumerate() {
            let id = i as u128 + 1;
            prop_assert!(store.apply_insert(row(id, 1, sender, i as u64), &cache));
        }

        // Profile lookups complete in an arbitrary order afterwards.
        for &user in &attach_order {
            store.attach_profile(&profile(user));
        }

        let ids: Vec<u128> = store.messages().iter().map(|m| m.message.id).collect();
        let expected: Vec<u128> = (1..=senders.len() as u128).collect();
        prop_assert_eq!(ids, expected);
    }

    /// Property: re-applying any subset of observed inserts never
    /// duplicates a message.
    #[test]
    fn prop_duplicate_inserts_are_rejected(
        count in 1usize..30,
        dup_seed in prop::collection::vec(0usize..30, 1..10),
    ) {
        let mut store = MessageStore::new();
        let cache = ProfileCache::new();
        store.load_history(1, Vec::new(), &cache);

        for i in 0..count {
            let id = i as u128 + 1;
            prop_assert!(store.apply_insert(row(id, 1, 7, i as u64), &cache));
        }

        for &i in &dup_seed {
            let id = (i % count) as u128 + 1;
            prop_assert!(!store.apply_insert(row(id, 1, 7, 0), &cache));
        }

        prop_assert_eq!(store.len(), count);
    }

    /// Property: updates never change the position of a message, only its
    /// reader set, and the reader set only grows.
    #[test]
    fn prop_updates_preserve_position_and_grow_readers(
        count in 1usize..20,
        updates in prop::collection::vec((0usize..20, prop::collection::vec(1u64..10, 0..5)), 0..30),
    ) {
        let mut store = MessageStore::new();
        let cache = ProfileCache::new();
        store.load_history(1, Vec::new(), &cache);

        for i in 0..count {
            let id = i as u128 + 1;
            store.apply_insert(row(id, 1, 7, i as u64), &cache);
        }

        let before: Vec<u128> = store.messages().iter().map(|m| m.message.id).collect();
        let mut reader_counts: Vec<usize> =
            store.messages().iter().map(|m| m.message.read_by.len()).collect();

        for (slot, readers) in &updates {
            let idx = slot % count;
            let mut patched = row(idx as u128 + 1, 1, 7, idx as u64);
            patched.read_by = readers.clone();
            prop_assert!(store.apply_update(&patched));

            let after_len = store.messages()[idx].message.read_by.len();
            prop_assert!(after_len >= reader_counts[idx]);
            reader_counts[idx] = after_len;
        }

        let after: Vec<u128> = store.messages().iter().map(|m| m.message.id).collect();
        prop_assert_eq!(before, after);
    }

    /// Property: a history load of N rows exposes exactly those N rows in
    /// creation order.
    #[test]
    fn prop_history_round_trips_in_creation_order(
        stamps in prop::collection::vec(0u64..1000, 0..40),
    ) {
        let rows: Vec<Message> = stamps
            .iter()
            .enumerate()
            .map(|(i, &t)| row(i as u128 + 1, 1, 7, t))
            .collect();

        let mut store = MessageStore::new();
        let cache = ProfileCache::new();
        store.load_history(1, rows.clone(), &cache);

        prop_assert_eq!(store.len(), rows.len());
        let loaded: Vec<(u64, u128)> =
            store.messages().iter().map(|m| (m.message.created_at, m.message.id)).collect();
        let mut expected: Vec<(u64, u128)> =
            rows.iter().map(|r| (r.created_at, r.id)).collect();
        expected.sort_unstable();
        prop_assert_eq!(loaded, expected);
    }
}
