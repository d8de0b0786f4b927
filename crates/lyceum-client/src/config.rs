//! Synchronizer tuning knobs.

use std::time::Duration;

use lyceum_core::typing;

/// Configuration for a [`crate::ChatSession`].
#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    /// Idle window after the last keystroke before the typing indicator
    /// stops.
    pub typing_idle_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { typing_idle_timeout: typing::DEFAULT_IDLE_TIMEOUT }
    }
}
