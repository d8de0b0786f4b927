//! Ordered message history for the active room.
//!
//! The store holds exactly one room's messages at a time. History loads
//! install the backend's creation order; live inserts append at the tail;
//! live updates patch a row in place without moving it. Switching rooms
//! resets the store completely, so stale messages never bleed into the
//! next room's view.
//!
//! Sender profiles are attached from the shared [`ProfileCache`] and may
//! arrive out of order relative to the messages themselves; a message
//! whose sender is not yet cached renders with a fallback label until
//! [`MessageStore::attach_profile`] fills it in.

use crate::{
    model::{Message, MessageId, Profile, RoomId, UserId},
    profiles::ProfileCache,
    receipts,
};

/// A message enriched with its sender's cached profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// The underlying message row.
    pub message: Message,
    /// Sender profile, once resolved. `None` renders as "Unknown".
    pub sender: Option<Profile>,
}

/// Ordered message list for one active room.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    room: Option<RoomId>,
    messages: Vec<ChatMessage>,
}

impl MessageStore {
    /// Create an empty store with no active room.
    pub fn new() -> Self {
        Self::default()
    }

    /// The room currently loaded, if any.
    pub fn room(&self) -> Option<RoomId> {
        self.room
    }

    /// Clear all state. Called on every room switch before the next load.
    pub fn reset(&mut self) {
        self.room = None;
        self.messages.clear();
    }

    /// Install the full history for `room`, replacing any previous state.
    ///
    /// Rows are sorted by `(created_at, id)` ascending; cached sender
    /// profiles are attached immediately. Senders still missing from the
    /// cache are reported by [`Self::missing_senders`] for one batched
    /// lookup.
    pub fn load_history(&mut self, room: RoomId, mut rows: Vec<Message>, cache: &ProfileCache) {
        rows.sort_by_key(|row| (row.created_at, row.id));
        rows.retain(|row| row.room_id == room);

        self.room = Some(room);
        self.messages = rows
            .into_iter()
            .map(|row| {
                let sender = cache.get(row.sender_id).cloned();
                ChatMessage { message: row, sender }
            })
            .collect();
    }

    /// Distinct senders with no attached profile, in first-appearance
    /// order. The caller resolves these with a single batched fetch.
    pub fn missing_senders(&self) -> Vec<UserId> {
        let mut out = Vec::new();
        for entry in &self.messages {
            let sender = entry.message.sender_id;
            if entry.sender.is_none() && !out.contains(&sender) {
                out.push(sender);
            }
        }
        out
    }

    /// Append a live insert at the tail.
    ///
    /// Returns `false` without mutating when the row belongs to a
    /// different room or its id is already present: a message is never
    /// duplicated once an insert event has been observed.
    pub fn apply_insert(&mut self, row: Message, cache: &ProfileCache) -> bool {
        if self.room != Some(row.room_id) {
            return false;
        }
        if self.messages.iter().any(|m| m.message.id == row.id) {
            return false;
        }

        let sender = cache.get(row.sender_id).cloned();
        self.messages.push(ChatMessage { message: row, sender });
        true
    }

    /// Patch an existing row in place.
    ///
    /// Only the mutable field is touched: the reader set is merged as a
    /// union so it can only grow, and the message keeps its position in
    /// the list. Returns `false` when the row is unknown or belongs to a
    /// different room.
    pub fn apply_update(&mut self, row: &Message) -> bool {
        if self.room != Some(row.room_id) {
            return false;
        }
        let Some(entry) = self.messages.iter_mut().find(|m| m.message.id == row.id) else {
            return false;
        };

        entry.message.read_by = receipts::merge_readers(&entry.message.read_by, &row.read_by);
        true
    }

    /// Attach a freshly resolved profile to every message from that
    /// sender. Safe to call at any time; lazy lookups may complete in any
    /// order relative to newer inserts.
    pub fn attach_profile(&mut self, profile: &Profile) {
        for entry in &mut self.messages {
            if entry.message.sender_id == profile.user_id && entry.sender.is_none() {
                entry.sender = Some(profile.clone());
            }
        }
    }

    /// The messages in display order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of loaded messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the store holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The stored entry for `id`, if present.
    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.message.id == id)
    }

    /// Messages still unread by `reader`, paired with the reader set to
    /// write back (current set plus `reader`).
    ///
    /// One write per message: the backend exposes no bulk-update
    /// primitive, and the per-message union stays idempotent under races
    /// with other clients.
    pub fn receipts_needed(&self, reader: UserId) -> Vec<(MessageId, Vec<UserId>)> {
        self.messages
            .iter()
            .filter(|m| receipts::needs_receipt(&m.message, reader))
            .map(|m| (m.message.id, receipts::with_reader(&m.message.read_by, reader)))
            .collect()
    }
}
