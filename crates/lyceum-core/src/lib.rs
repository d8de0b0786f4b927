//! Core domain logic for the Lyceum portal synchronizer.
//!
//! Pure, deterministic components with no I/O or async dependencies. Each
//! module owns one concern of the conversation-synchronization pipeline and
//! is driven entirely by its caller:
//!
//! - [`model`]: rows mirroring the hosted platform's tables.
//! - [`membership`]: which rooms an actor may see, and under what name.
//! - [`store`]: ordered message history for the active room.
//! - [`profiles`]: cache-aside identity cache shared across components.
//! - [`receipts`]: read-receipt predicates and monotone reader-set union.
//! - [`notifications`]: unread badge counts recomputed from the full set.
//! - [`typing`]: debounced typing transitions and peer roster.
//! - [`alerts`]: role-filtered alert routing for inserted notifications.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod alerts;
pub mod membership;
pub mod model;
pub mod notifications;
pub mod profiles;
pub mod receipts;
pub mod store;
pub mod typing;

pub use alerts::{Alert, alert_for, should_alert};
pub use membership::{RoomView, room_matches_profile, visible_rooms};
pub use model::{
    Message, MessageId, Notification, NotificationId, NotificationKind, Profile, Role, Room,
    RoomId, RoomKind, Timestamp, UserId,
};
pub use notifications::{NotificationLedger, UnreadCounts};
pub use profiles::ProfileCache;
pub use receipts::{needs_receipt, unread_count, with_reader};
pub use store::{ChatMessage, MessageStore};
pub use typing::{TypingRoster, TypingSignaler, TypingTransition};
