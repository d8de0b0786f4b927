//! In-memory platform simulation for synchronizer testing.
//!
//! [`MemoryPlatform`] fakes the hosted backend above the transport: shared
//! tables, per-room change feeds, notification feeds with row-level
//! visibility, and presence channels with synchronized snapshots. Multiple
//! [`MemoryBackend`] clients share one platform, which is what lets tests
//! run an admin and a user against the same world and observe each
//! other's writes live.
//!
//! Fault injection covers the failure taxonomy: one-shot failures for
//! history loads, feed subscriptions, and writes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod memory;

pub use memory::{MemoryBackend, MemoryPlatform};
