//! Session side-effects.
//!
//! Instructions produced by the [`crate::ChatSession`] state machine for
//! the runtime to execute. The machine never performs I/O itself; every
//! backend round-trip is requested through one of these.

use lyceum_core::{MessageId, RoomId, UserId};

/// Actions produced by the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Fetch the full message history for a room.
    LoadHistory {
        /// Room to fetch.
        room_id: RoomId,
    },

    /// Open the message feed and presence channel for a room.
    OpenFeeds {
        /// Room to subscribe to.
        room_id: RoomId,
    },

    /// Close the message feed and presence channel for a room. The
    /// runtime must deliver [`crate::SyncEvent::FeedsClosed`] once both
    /// are released.
    CloseFeeds {
        /// Room to unsubscribe from.
        room_id: RoomId,
    },

    /// Resolve a batch of profiles through the shared cache.
    LoadProfiles {
        /// Distinct identities to resolve.
        users: Vec<UserId>,
    },

    /// Insert a message row.
    PersistMessage {
        /// Target room.
        room_id: RoomId,
        /// Trimmed body text.
        body: String,
    },

    /// Write a message's reader set (current set plus the new reader).
    PersistReadBy {
        /// Message to patch.
        message_id: MessageId,
        /// Full reader set to write.
        read_by: Vec<UserId>,
    },

    /// Publish the local typing state on the active presence channel.
    PublishTyping {
        /// Room the channel is scoped to.
        room_id: RoomId,
        /// New typing state.
        typing: bool,
    },

    /// Re-render the UI from current state.
    Render,

    /// Surface a transient, non-fatal notice to the user.
    Warn {
        /// Human-readable description.
        reason: String,
    },
}
