//! Debounced typing transitions and the peer typing roster.
//!
//! Typing state is advisory and ephemeral: it travels over the room's
//! presence channel, is never persisted, and is lost on disconnect. The
//! signaler collapses keystroke bursts so a continuous burst produces
//! exactly one `Started` and one `Stopped` transition, bounded by an idle
//! timeout.
//!
//! Generic over the instant type `I` so the same state machine runs on
//! `std::time::Instant` in production and virtual clocks in tests.

use std::{collections::BTreeSet, ops::Add, time::Duration};

use crate::model::UserId;

/// Default idle window after the last keystroke before typing stops.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(3);

/// A typing-state edge to publish on the presence channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingTransition {
    /// The composer went from idle to typing.
    Started,
    /// The composer went from typing to idle.
    Stopped,
}

/// Debounces the local composer into typing-state edges.
#[derive(Debug, Clone)]
pub struct TypingSignaler<I> {
    typing: bool,
    deadline: Option<I>,
    idle_timeout: Duration,
}

impl<I> TypingSignaler<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Create an idle signaler with the given idle timeout.
    pub fn new(idle_timeout: Duration) -> Self {
        Self { typing: false, deadline: None, idle_timeout }
    }

    /// Whether the local composer is currently considered typing.
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Feed one composer change.
    ///
    /// Emits `Started` on the first non-empty input while idle and
    /// `Stopped` when the input becomes empty. Keystrokes while already
    /// typing refresh the idle deadline and emit nothing, which is what
    /// collapses a burst to a single transition on each side.
    pub fn composer_changed(&mut self, empty: bool, now: I) -> Option<TypingTransition> {
        if empty {
            return self.stop();
        }

        self.deadline = Some(now + self.idle_timeout);
        if self.typing {
            None
        } else {
            self.typing = true;
            Some(TypingTransition::Started)
        }
    }

    /// Sweep the idle deadline. Emits `Stopped` once `now` reaches the
    /// deadline with no intervening keystroke.
    pub fn poll(&mut self, now: I) -> Option<TypingTransition> {
        if self.typing && self.deadline.is_some_and(|deadline| now >= deadline) {
            return self.stop();
        }
        None
    }

    /// Drop back to idle without publishing. Used on room switch, where
    /// closing the presence channel already clears the remote state.
    pub fn reset(&mut self) {
        self.typing = false;
        self.deadline = None;
    }

    fn stop(&mut self) -> Option<TypingTransition> {
        self.deadline = None;
        if self.typing {
            self.typing = false;
            Some(TypingTransition::Stopped)
        } else {
            None
        }
    }
}

/// Currently-typing peers derived from presence-channel snapshots.
///
/// Holds only the latest snapshot, always excluding self; there is no
/// history to reconcile, so a snapshot simply replaces the previous one.
#[derive(Debug, Clone)]
pub struct TypingRoster {
    self_id: UserId,
    typing: BTreeSet<UserId>,
}

impl TypingRoster {
    /// Create an empty roster for the local identity.
    pub fn new(self_id: UserId) -> Self {
        Self { self_id, typing: BTreeSet::new() }
    }

    /// Replace the roster with a fresh channel snapshot of
    /// `(identity, is_typing)` entries.
    pub fn apply_snapshot(&mut self, snapshot: &[(UserId, bool)]) {
        self.typing = snapshot
            .iter()
            .filter(|&&(user, typing)| typing && user != self.self_id)
            .map(|&(user, _)| user)
            .collect();
    }

    /// Peers currently typing, in stable order.
    pub fn peers(&self) -> impl Iterator<Item = UserId> + '_ {
        self.typing.iter().copied()
    }

    /// Whether any peer is typing.
    pub fn is_empty(&self) -> bool {
        self.typing.is_empty()
    }

    /// Clear all state. Called when the presence channel closes.
    pub fn clear(&mut self) {
        self.typing.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Virtual clock in milliseconds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    struct TestInstant(u64);

    impl Add<Duration> for TestInstant {
        type Output = Self;

        fn add(self, duration: Duration) -> Self {
            Self(self.0 + duration.as_millis() as u64)
        }
    }

    fn at(offset_ms: u64) -> TestInstant {
        TestInstant(1_000 + offset_ms)
    }

    fn signaler() -> TypingSignaler<TestInstant> {
        TypingSignaler::new(Duration::from_secs(3))
    }

    #[test]
    fn keystroke_burst_collapses_to_one_transition_each_way() {
        let mut s = signaler();

        let mut transitions = Vec::new();
        for i in 0..10 {
            if let Some(t) = s.composer_changed(false, at(i * 100)) {
                transitions.push(t);
            }
        }
        if let Some(t) = s.composer_changed(true, at(1_100)) {
            transitions.push(t);
        }

        assert_eq!(transitions, vec![TypingTransition::Started, TypingTransition::Stopped]);
    }

    #[test]
    fn idle_timeout_stops_typing_once() {
        let mut s = signaler();
        assert_eq!(s.composer_changed(false, at(0)), Some(TypingTransition::Started));

        // Still within the window: nothing fires.
        assert_eq!(s.poll(at(2_000)), None);

        // Deadline reached: exactly one stop, then quiescent.
        assert_eq!(s.poll(at(3_000)), Some(TypingTransition::Stopped));
        assert_eq!(s.poll(at(10_000)), None);
        assert!(!s.is_typing());
    }

    #[test]
    fn keystrokes_refresh_the_idle_deadline() {
        let mut s = signaler();
        s.composer_changed(false, at(0));
        s.composer_changed(false, at(2_500));

        // The original deadline has passed but was refreshed.
        assert_eq!(s.poll(at(3_000)), None);
        assert_eq!(s.poll(at(5_500)), Some(TypingTransition::Stopped));
    }

    #[test]
    fn empty_input_while_idle_emits_nothing() {
        let mut s = signaler();
        assert_eq!(s.composer_changed(true, at(0)), None);
        assert_eq!(s.poll(at(60_000)), None);
    }

    #[test]
    fn roster_excludes_self_and_non_typers() {
        let mut roster = TypingRoster::new(9);
        roster.apply_snapshot(&[(9, true), (1, true), (2, false), (3, true)]);

        let peers: Vec<UserId> = roster.peers().collect();
        assert_eq!(peers, vec![1, 3]);
    }

    #[test]
    fn snapshot_replaces_previous_state() {
        let mut roster = TypingRoster::new(9);
        roster.apply_snapshot(&[(1, true)]);
        roster.apply_snapshot(&[(2, true)]);

        let peers: Vec<UserId> = roster.peers().collect();
        assert_eq!(peers, vec![2]);
        assert!(!roster.is_empty());

        roster.clear();
        assert!(roster.is_empty());
    }
}
