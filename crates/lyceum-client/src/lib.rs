//! Realtime conversation synchronizer for the Lyceum portal.
//!
//! Keeps a local view of room membership, message history, read state,
//! typing presence, and notification badges consistent with a live event
//! stream from the hosted backend, for both user and admin actors.
//!
//! # Components
//!
//! - [`Backend`]: async trait seam to the persistence/auth/realtime
//!   platform; faked by the harness in tests.
//! - [`ChatSession`]: sans-IO state machine owning the active room's
//!   lifecycle (`Idle → Loading → Live → Closing`), consuming
//!   [`SyncEvent`] inputs and producing [`SyncAction`] instructions.
//! - [`SyncRuntime`]: orchestration loop that executes actions against
//!   the backend and feeds completions back into the session.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod backend;
mod config;
mod error;
mod event;
mod runtime;
mod session;

pub use action::SyncAction;
pub use backend::{
    Backend, BackendError, MessageChange, MessageFeed, NotificationChange, NotificationFeed,
    PresenceChannel, PresenceSnapshot,
};
pub use config::SyncConfig;
pub use error::SyncError;
pub use event::SyncEvent;
pub use runtime::SyncRuntime;
pub use session::{ChatSession, Phase};
