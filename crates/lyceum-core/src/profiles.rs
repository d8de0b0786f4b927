//! Cache-aside identity cache.
//!
//! Every component that renders a sender (the message store, the
//! membership resolver, notification surfaces) reads through this one
//! cache, so each distinct identity is fetched from the backend at most
//! once per session. Lookups that fail are simply absent: callers render
//! a fallback label and the next activation retries.

use std::collections::HashMap;

use crate::model::{Profile, UserId};

/// In-memory profile cache keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct ProfileCache {
    entries: HashMap<UserId, Profile>,
}

impl ProfileCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached profile for `user`, if any.
    pub fn get(&self, user: UserId) -> Option<&Profile> {
        self.entries.get(&user)
    }

    /// Whether `user` has a cached profile.
    pub fn contains(&self, user: UserId) -> bool {
        self.entries.contains_key(&user)
    }

    /// Insert or refresh a single profile.
    pub fn insert(&mut self, profile: Profile) {
        self.entries.insert(profile.user_id, profile);
    }

    /// Insert or refresh a batch of profiles.
    pub fn extend(&mut self, profiles: impl IntoIterator<Item = Profile>) {
        for profile in profiles {
            self.insert(profile);
        }
    }

    /// The subset of `users` with no cached profile, deduplicated,
    /// preserving first-seen order.
    ///
    /// This is what bounds lookups to O(distinct senders): callers collect
    /// the senders of a loaded batch, ask for the missing ones, and issue
    /// a single batched fetch.
    pub fn missing(&self, users: impl IntoIterator<Item = UserId>) -> Vec<UserId> {
        let mut out = Vec::new();
        for user in users {
            if !self.contains(user) && !out.contains(&user) {
                out.push(user);
            }
        }
        out
    }

    /// Number of cached profiles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
