//! Read-receipt predicates and reader-set union.
//!
//! The reader set on a message row is grow-only. Every write the
//! synchronizer issues goes through [`with_reader`], a commutative and
//! idempotent set union, which is what makes the backend's last-write-wins
//! row semantics safe: concurrent receipt writes for the same message can
//! interleave in any order without losing a reader that this client has
//! already observed.

use crate::model::{Message, UserId};

/// Whether `reader` still needs a receipt on this message.
///
/// A message is unread by `reader` iff `reader` is not the sender and does
/// not appear in the reader set. Own messages never need receipts.
pub fn needs_receipt(message: &Message, reader: UserId) -> bool {
    message.sender_id != reader && !message.seen_by(reader)
}

/// Reader set with `reader` added. Idempotent: adding a present reader
/// returns the set unchanged.
pub fn with_reader(read_by: &[UserId], reader: UserId) -> Vec<UserId> {
    let mut out = read_by.to_vec();
    if !out.contains(&reader) {
        out.push(reader);
    }
    out
}

/// Union of two reader sets, preserving `current` order and appending
/// newcomers in `incoming` order.
///
/// Used when patching a message in place: merging instead of replacing
/// guarantees the local view never shrinks a reader set, even if an
/// out-of-date row arrives from the feed.
pub fn merge_readers(current: &[UserId], incoming: &[UserId]) -> Vec<UserId> {
    let mut out = current.to_vec();
    for &reader in incoming {
        if !out.contains(&reader) {
            out.push(reader);
        }
    }
    out
}

/// Number of messages in `messages` still unread by `reader`.
pub fn unread_count<'a>(messages: impl IntoIterator<Item = &'a Message>, reader: UserId) -> usize {
    messages.into_iter().filter(|m| needs_receipt(m, reader)).count()
}
