//! Session events.
//!
//! Inputs that drive the [`crate::ChatSession`] state machine. Events
//! originate from three sources: UI intents (room selection, composer,
//! send), backend completions (history, profiles, writes), and live feed
//! deliveries (inserts, updates, presence snapshots).
//!
//! Generic over `I` (instant type) to support both production
//! (`std::time::Instant`) and virtual clocks in tests, the same shape as
//! the time-parameterized machines elsewhere in this workspace.

use lyceum_core::{Message, MessageId, Profile, RoomId, UserId};

use crate::backend::{NotificationChange, PresenceSnapshot};

/// Events processed by the session state machine.
#[derive(Debug, Clone)]
pub enum SyncEvent<I = std::time::Instant> {
    /// UI selected a room.
    SelectRoom {
        /// Room to activate.
        room_id: RoomId,
    },

    /// UI left the chat surface entirely.
    CloseSession,

    /// History fetch completed.
    HistoryLoaded {
        /// Room the fetch was issued for.
        room_id: RoomId,
        /// Full message history, backend order.
        rows: Vec<Message>,
    },

    /// History fetch failed.
    HistoryFailed {
        /// Room the fetch was issued for.
        room_id: RoomId,
        /// Failure description.
        reason: String,
    },

    /// Message feed and presence channel are open.
    FeedsOpened {
        /// Room the feeds are scoped to.
        room_id: RoomId,
    },

    /// Opening the feeds failed.
    FeedsFailed {
        /// Room the feeds were scoped to.
        room_id: RoomId,
        /// Failure description.
        reason: String,
    },

    /// Both feeds are fully closed.
    FeedsClosed {
        /// Room the feeds were scoped to.
        room_id: RoomId,
    },

    /// A message row was inserted, delivered on the live feed.
    MessageInserted {
        /// Room the row belongs to.
        room_id: RoomId,
        /// The inserted row.
        row: Message,
    },

    /// A message row was updated, delivered on the live feed.
    MessageUpdated {
        /// Room the row belongs to.
        room_id: RoomId,
        /// The updated row.
        row: Message,
    },

    /// A batched profile lookup completed.
    ProfilesLoaded {
        /// Resolved profiles. Unknown ids are absent.
        profiles: Vec<Profile>,
    },

    /// A batched profile lookup failed.
    ProfilesFailed {
        /// Identities that were being resolved.
        users: Vec<UserId>,
        /// Failure description.
        reason: String,
    },

    /// A presence snapshot arrived for the active room.
    PresenceSynced {
        /// Room the snapshot is scoped to.
        room_id: RoomId,
        /// Latest `(identity, is_typing)` state of all trackers.
        snapshot: PresenceSnapshot,
    },

    /// The composer input changed.
    ComposerChanged {
        /// Whether the input is now empty.
        empty: bool,
        /// Current time.
        now: I,
    },

    /// Periodic tick for idle-timeout sweeps.
    Tick {
        /// Current time.
        now: I,
    },

    /// UI requested sending the composer contents.
    SendMessage {
        /// Message body. Leading/trailing whitespace is trimmed; an
        /// empty result is a no-op.
        body: String,
        /// Current time.
        now: I,
    },

    /// A send write failed.
    SendFailed {
        /// Room the send targeted.
        room_id: RoomId,
        /// Failure description.
        reason: String,
    },

    /// A read-receipt write failed.
    ReceiptFailed {
        /// Message the receipt targeted.
        message_id: MessageId,
        /// Failure description.
        reason: String,
    },

    /// A notification row changed. Handled by the runtime (refetch and
    /// recount), never forwarded to the session machine.
    NotificationChanged {
        /// The delivered change.
        change: NotificationChange,
    },
}
