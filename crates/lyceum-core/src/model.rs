//! Rows mirroring the hosted platform's tables.
//!
//! The synchronizer never owns this data; it holds transient, derived
//! copies of rows served by the persistence collaborator. Serde wire tags
//! match the stored category strings so these types round-trip against the
//! platform's JSON payloads unchanged.

use serde::{Deserialize, Serialize};

/// 128-bit room UUID.
pub type RoomId = u128;

/// Stable user identity assigned by the authentication provider.
pub type UserId = u64;

/// 128-bit message UUID.
pub type MessageId = u128;

/// 128-bit notification UUID.
pub type NotificationId = u128;

/// Milliseconds since the Unix epoch, assigned by the backend.
pub type Timestamp = u64;

/// Actor role. Determines room visibility and alert routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular student account.
    User,
    /// Administrator account.
    Admin,
}

/// Stored room category.
///
/// The platform keeps these as strings on the `chat_rooms` table; the
/// serde tags match the stored values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomKind {
    /// Broadcast room between the admin team and every user.
    #[serde(rename = "admin_all_users")]
    AdminAllUsers,

    /// Peer room among users only. Admins do not see it.
    #[serde(rename = "all_users")]
    AllUsers,

    /// Private room between one user and the admin team.
    #[serde(rename = "user_admin")]
    UserAdmin,
}

/// A chat room row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Room identity.
    pub id: RoomId,
    /// Stored room name. For scoped rooms this historically embeds the
    /// owning user's name or email.
    pub name: String,
    /// Stored category.
    pub kind: RoomKind,
    /// Explicit owning identity for `user_admin` rooms, resolved at
    /// room-creation time. `None` on legacy rows, which fall back to
    /// name/email matching.
    pub owner: Option<UserId>,
    /// Creation time.
    pub created_at: Timestamp,
}

/// A chat message row.
///
/// `read_by` is a grow-only reader set: every write path merges rather
/// than replaces, so the set never shrinks through this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message identity.
    pub id: MessageId,
    /// Room this message belongs to.
    pub room_id: RoomId,
    /// Sender identity.
    pub sender_id: UserId,
    /// Message body text.
    pub body: String,
    /// Creation time. Messages within a room are totally ordered by
    /// `(created_at, id)`.
    pub created_at: Timestamp,
    /// Identities that have seen this message.
    pub read_by: Vec<UserId>,
}

impl Message {
    /// Whether `user` appears in the reader set.
    pub fn seen_by(&self, user: UserId) -> bool {
        self.read_by.contains(&user)
    }
}

/// A user profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile identity.
    pub user_id: UserId,
    /// Display name. Optional; older accounts may only have an email.
    pub full_name: Option<String>,
    /// Account email.
    pub email: String,
}

impl Profile {
    /// Human-readable label: the full name when present, else the email.
    pub fn label(&self) -> &str {
        match &self.full_name {
            Some(name) if !name.is_empty() => name,
            _ => &self.email,
        }
    }
}

/// Stored notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A new assignment was posted.
    Assignment,
    /// A complaint was filed.
    Complaint,
    /// An emergency was reported.
    Emergency,
    /// A submission was graded.
    Grade,
    /// A course application changed state.
    Application,
}

impl NotificationKind {
    /// All categories, in badge display order.
    pub const ALL: [Self; 5] =
        [Self::Assignment, Self::Complaint, Self::Emergency, Self::Grade, Self::Application];
}

/// A notification row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification identity.
    pub id: NotificationId,
    /// Owning identity.
    pub user_id: UserId,
    /// Category tag.
    pub kind: NotificationKind,
    /// Short headline.
    pub title: String,
    /// Detail text.
    pub message: String,
    /// Optional in-app link target.
    pub link: Option<String>,
    /// Whether the owner has read it.
    pub read: bool,
    /// Creation time.
    pub created_at: Timestamp,
}
