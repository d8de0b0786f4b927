//! Session errors.
//!
//! The session state machine treats almost everything as recoverable:
//! backend failures arrive as events and degrade the room rather than
//! erroring. [`SyncError`] is reserved for caller misuse, which indicates
//! a UI wiring bug rather than an environmental fault.

use thiserror::Error;

/// Errors returned by [`crate::ChatSession::handle`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// An operation that requires an active room was attempted while no
    /// room is selected.
    #[error("no active room")]
    NoActiveRoom,
}
