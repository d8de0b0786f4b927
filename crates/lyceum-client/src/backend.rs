//! Async seam to the hosted persistence/auth/realtime platform.
//!
//! The synchronizer never talks to the network directly; everything goes
//! through [`Backend`]. Production wires this to the platform SDK, the
//! harness provides an in-memory simulation. Subscription primitives
//! return owned handles whose channels close when the handle is dropped,
//! which is what guarantees release on every exit path.

use async_trait::async_trait;
use lyceum_core::{
    Message, MessageId, Notification, NotificationKind, Profile, Role, Room, RoomId, UserId,
};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors surfaced by the platform collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// No authenticated identity.
    #[error("not authenticated")]
    Unauthenticated,

    /// Transport-level failure talking to the platform.
    #[error("network failure: {reason}")]
    Network {
        /// Description of the underlying failure.
        reason: String,
    },

    /// A referenced row does not exist.
    #[error("not found: {what}")]
    NotFound {
        /// What was being looked up.
        what: String,
    },

    /// The platform rejected a write.
    #[error("write rejected: {reason}")]
    Rejected {
        /// Rejection reason reported by the platform.
        reason: String,
    },
}

impl BackendError {
    /// True when a retry of the same call may succeed.
    ///
    /// Network failures are transient; missing rows and rejected writes
    /// indicate a logic or authorization problem and are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

/// A change delivered on a room's durable-message feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageChange {
    /// A row was inserted.
    Inserted(Message),
    /// A row was updated (only `read_by` is mutable).
    Updated(Message),
}

/// Live subscription to one room's message changes.
///
/// Delivery ends when the feed is dropped; the backend observes the
/// closed channel and releases the subscription.
#[derive(Debug)]
pub struct MessageFeed {
    rx: mpsc::UnboundedReceiver<MessageChange>,
}

impl MessageFeed {
    /// Wrap a delivery channel. Called by backend implementations.
    pub fn new(rx: mpsc::UnboundedReceiver<MessageChange>) -> Self {
        Self { rx }
    }

    /// Next change, or `None` once the backend closes the feed.
    pub async fn next(&mut self) -> Option<MessageChange> {
        self.rx.recv().await
    }
}

/// A change delivered on the actor's notification feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationChange {
    /// A row was inserted.
    Inserted(Notification),
    /// A row was updated (e.g. marked read).
    Updated(Notification),
}

/// Live subscription to the actor's notification changes.
#[derive(Debug)]
pub struct NotificationFeed {
    rx: mpsc::UnboundedReceiver<NotificationChange>,
}

impl NotificationFeed {
    /// Wrap a delivery channel. Called by backend implementations.
    pub fn new(rx: mpsc::UnboundedReceiver<NotificationChange>) -> Self {
        Self { rx }
    }

    /// Next change, or `None` once the backend closes the feed.
    pub async fn next(&mut self) -> Option<NotificationChange> {
        self.rx.recv().await
    }
}

/// One synchronized view of a room's presence state:
/// `(identity, is_typing)` for every tracked client.
pub type PresenceSnapshot = Vec<(UserId, bool)>;

/// Membership of a room's ephemeral presence channel.
///
/// Publishing updates this client's tracked state; snapshots of all
/// trackers arrive on the receiving side. Dropping the channel leaves the
/// room: the backend clears this client's entry and notifies the rest.
#[derive(Debug)]
pub struct PresenceChannel {
    publisher: mpsc::UnboundedSender<bool>,
    snapshots: mpsc::UnboundedReceiver<PresenceSnapshot>,
}

impl PresenceChannel {
    /// Wrap the publish/snapshot channels. Called by backend
    /// implementations.
    pub fn new(
        publisher: mpsc::UnboundedSender<bool>,
        snapshots: mpsc::UnboundedReceiver<PresenceSnapshot>,
    ) -> Self {
        Self { publisher, snapshots }
    }

    /// Publish this client's typing state. Advisory: a closed channel
    /// (room already left) is silently ignored.
    pub fn publish(&self, typing: bool) {
        if self.publisher.send(typing).is_err() {
            tracing::debug!("presence channel already closed");
        }
    }

    /// Split off the snapshot receiver so a forwarding task can own it
    /// while the publisher half stays with the runtime.
    pub fn split(self) -> (mpsc::UnboundedSender<bool>, mpsc::UnboundedReceiver<PresenceSnapshot>) {
        (self.publisher, self.snapshots)
    }

    /// Next presence snapshot, or `None` once the channel closes.
    pub async fn next_snapshot(&mut self) -> Option<PresenceSnapshot> {
        self.snapshots.recv().await
    }
}

/// The hosted platform as seen by the synchronizer.
///
/// Implementations must be cheap to share (`Arc`) and callable from any
/// task. All operations are fallible; the synchronizer treats failures
/// per the taxonomy on [`BackendError`].
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// The authenticated actor's profile and role.
    async fn current_user(&self) -> Result<(Profile, Role), BackendError>;

    /// The unfiltered room catalog, visibility-filtered client-side.
    async fn list_rooms(&self) -> Result<Vec<Room>, BackendError>;

    /// The full profile directory (used by admins to label scoped rooms).
    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError>;

    /// Full message history for a room.
    async fn load_messages(&self, room: RoomId) -> Result<Vec<Message>, BackendError>;

    /// Profiles for a batch of identities. Unknown ids are simply absent
    /// from the result.
    async fn load_profiles(&self, users: &[UserId]) -> Result<Vec<Profile>, BackendError>;

    /// Insert a message row. Id and timestamp are backend-assigned.
    async fn insert_message(
        &self,
        room: RoomId,
        sender: UserId,
        body: &str,
    ) -> Result<(), BackendError>;

    /// Overwrite a message's reader set. Callers must pass the union of
    /// the current set and the new reader so the row never shrinks.
    async fn update_read_by(
        &self,
        message: MessageId,
        read_by: &[UserId],
    ) -> Result<(), BackendError>;

    /// All notification rows owned by `user`.
    async fn load_notifications(&self, user: UserId) -> Result<Vec<Notification>, BackendError>;

    /// Mark every unread notification of one kind read for `user`.
    async fn mark_notifications_read(
        &self,
        user: UserId,
        kind: NotificationKind,
    ) -> Result<(), BackendError>;

    /// Open a live feed of message changes scoped to `room`.
    async fn subscribe_messages(&self, room: RoomId) -> Result<MessageFeed, BackendError>;

    /// Open a live feed of notification changes scoped to `user`.
    async fn subscribe_notifications(
        &self,
        user: UserId,
    ) -> Result<NotificationFeed, BackendError>;

    /// Join a room's ephemeral presence channel as `user`.
    async fn join_presence(
        &self,
        room: RoomId,
        user: UserId,
    ) -> Result<PresenceChannel, BackendError>;
}
