//! Session state machine.
//!
//! [`ChatSession`] owns the lifecycle of the active room: it is the only
//! component that decides when history is fetched, when feeds open and
//! close, and how inbound changes mutate local state. It is a pure state
//! machine in the style of the other machines in this workspace: it
//! consumes [`SyncEvent`] inputs and produces [`SyncAction`] instructions
//! for the runtime to execute, and performs no I/O of its own.
//!
//! # Lifecycle
//!
//! Per active room: `Idle → Loading → Live → Closing → Idle`. `Live`
//! self-loops on every inbound event. Any exit from `Live` closes both
//! feeds before the next room's `Loading` begins, so there are never
//! dangling subscriptions and never duplicate delivery.
//!
//! Events carry the room they are scoped to; anything arriving for a room
//! that is no longer active is discarded. That guard is what makes
//! in-flight completions for an abandoned room harmless.

use lyceum_core::{
    Message, MessageStore, Profile, ProfileCache, Role, RoomId, TypingRoster, TypingSignaler,
    TypingTransition, UserId, receipts,
};

use crate::{SyncAction, SyncConfig, SyncError, SyncEvent};

/// Lifecycle phase of the active room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No room selected.
    Idle,

    /// History fetch in flight for the selected room.
    Loading {
        /// Room being loaded.
        room_id: RoomId,
    },

    /// Room is active. `realtime` is false when the feeds could not be
    /// opened: history is visible but no live updates arrive until the
    /// room is re-selected.
    Live {
        /// Active room.
        room_id: RoomId,
        /// Whether live feeds are delivering.
        realtime: bool,
    },

    /// Feed teardown in progress. `next` holds the room to load once
    /// teardown completes.
    Closing {
        /// Room being torn down.
        room_id: RoomId,
        /// Queued next selection, if any.
        next: Option<RoomId>,
    },
}

/// Conversation-synchronizer state machine for one actor.
#[derive(Debug)]
pub struct ChatSession<I = std::time::Instant> {
    actor: Profile,
    role: Role,
    phase: Phase,
    store: MessageStore,
    profiles: ProfileCache,
    typing: TypingSignaler<I>,
    roster: TypingRoster,
}

impl<I> ChatSession<I>
where
    I: Copy + Ord + std::ops::Add<std::time::Duration, Output = I>,
{
    /// Create an idle session for `actor`.
    pub fn new(actor: Profile, role: Role, config: SyncConfig) -> Self {
        let roster = TypingRoster::new(actor.user_id);
        Self {
            actor,
            role,
            phase: Phase::Idle,
            store: MessageStore::new(),
            profiles: ProfileCache::new(),
            typing: TypingSignaler::new(config.typing_idle_timeout),
            roster,
        }
    }

    /// The actor this session runs for.
    pub fn actor(&self) -> &Profile {
        &self.actor
    }

    /// The actor's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The active room, in any phase that has one.
    pub fn active_room(&self) -> Option<RoomId> {
        match self.phase {
            Phase::Idle => None,
            Phase::Loading { room_id }
            | Phase::Live { room_id, .. }
            | Phase::Closing { room_id, .. } => Some(room_id),
        }
    }

    /// Message store for the active room.
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Shared profile cache.
    pub fn profiles(&self) -> &ProfileCache {
        &self.profiles
    }

    /// Peers currently typing in the active room.
    pub fn typing_peers(&self) -> Vec<UserId> {
        self.roster.peers().collect()
    }

    /// Process an event and return resulting actions.
    pub fn handle(&mut self, event: SyncEvent<I>) -> Result<Vec<SyncAction>, SyncError> {
        match event {
            SyncEvent::SelectRoom { room_id } => Ok(self.handle_select_room(room_id)),
            SyncEvent::CloseSession => Ok(self.handle_close_session()),
            SyncEvent::HistoryLoaded { room_id, rows } => {
                Ok(self.handle_history_loaded(room_id, rows))
            },
            SyncEvent::HistoryFailed { room_id, reason } => {
                Ok(self.handle_history_failed(room_id, &reason))
            },
            SyncEvent::FeedsOpened { room_id } => Ok(self.handle_feeds_opened(room_id)),
            SyncEvent::FeedsFailed { room_id, reason } => {
                Ok(self.handle_feeds_failed(room_id, reason))
            },
            SyncEvent::FeedsClosed { room_id } => Ok(self.handle_feeds_closed(room_id)),
            SyncEvent::MessageInserted { room_id, row } => Ok(self.handle_insert(room_id, row)),
            SyncEvent::MessageUpdated { room_id, row } => Ok(self.handle_update(room_id, &row)),
            SyncEvent::ProfilesLoaded { profiles } => Ok(self.handle_profiles_loaded(profiles)),
            SyncEvent::ProfilesFailed { users, reason } => {
                tracing::debug!(?users, %reason, "profile lookup failed, rendering fallback");
                Ok(vec![])
            },
            SyncEvent::PresenceSynced { room_id, snapshot } => {
                Ok(self.handle_presence(room_id, &snapshot))
            },
            SyncEvent::ComposerChanged { empty, now } => Ok(self.handle_composer(empty, now)),
            SyncEvent::Tick { now } => Ok(self.handle_tick(now)),
            SyncEvent::SendMessage { body, now } => self.handle_send(&body, now),
            SyncEvent::SendFailed { room_id, reason } => {
                tracing::warn!(room_id, %reason, "send failed");
                Ok(vec![SyncAction::Warn { reason: "Failed to send message".into() }])
            },
            SyncEvent::ReceiptFailed { message_id, reason } => {
                tracing::warn!(message_id, %reason, "read receipt write failed");
                Ok(vec![SyncAction::Warn { reason: "Failed to update read state".into() }])
            },
            SyncEvent::NotificationChanged { .. } => {
                // Notification changes belong to the runtime's ledger, not
                // the room lifecycle.
                Ok(vec![])
            },
        }
    }

    fn handle_select_room(&mut self, room_id: RoomId) -> Vec<SyncAction> {
        match self.phase {
            Phase::Idle => {
                self.begin_loading(room_id);
                vec![SyncAction::LoadHistory { room_id }, SyncAction::Render]
            },
            Phase::Loading { room_id: current } => {
                if current == room_id {
                    return vec![];
                }
                // No feeds are open yet; the stale history response is
                // discarded by the room-id guard when it lands.
                self.begin_loading(room_id);
                vec![SyncAction::LoadHistory { room_id }, SyncAction::Render]
            },
            Phase::Live { room_id: current, realtime } => {
                if current == room_id {
                    if realtime {
                        return vec![];
                    }
                    // Re-selecting a degraded room retries the whole
                    // activation; no feeds are open to tear down.
                    self.begin_loading(room_id);
                    return vec![SyncAction::LoadHistory { room_id }, SyncAction::Render];
                }
                if realtime {
                    self.begin_closing(current, Some(room_id));
                    return vec![SyncAction::CloseFeeds { room_id: current }, SyncAction::Render];
                }
                // Leaving a degraded room: nothing to close.
                self.begin_loading(room_id);
                vec![SyncAction::LoadHistory { room_id }, SyncAction::Render]
            },
            Phase::Closing { room_id: current, .. } => {
                self.phase = Phase::Closing { room_id: current, next: Some(room_id) };
                vec![]
            },
        }
    }

    fn handle_close_session(&mut self) -> Vec<SyncAction> {
        match self.phase {
            Phase::Idle => vec![],
            Phase::Loading { .. } => {
                self.clear_room_state();
                self.phase = Phase::Idle;
                vec![SyncAction::Render]
            },
            Phase::Live { room_id, .. } => {
                self.begin_closing(room_id, None);
                vec![SyncAction::CloseFeeds { room_id }, SyncAction::Render]
            },
            Phase::Closing { room_id, .. } => {
                self.phase = Phase::Closing { room_id, next: None };
                vec![]
            },
        }
    }

    fn handle_history_loaded(&mut self, room_id: RoomId, rows: Vec<Message>) -> Vec<SyncAction> {
        if self.phase != (Phase::Loading { room_id }) {
            tracing::debug!(room_id, "discarding stale history response");
            return vec![];
        }

        self.store.load_history(room_id, rows, &self.profiles);

        let mut actions = Vec::new();
        let missing = self.store.missing_senders();
        if !missing.is_empty() {
            actions.push(SyncAction::LoadProfiles { users: missing });
        }
        actions.push(SyncAction::OpenFeeds { room_id });

        // Bulk catch-up: one receipt write per unread message. The
        // backend has no bulk-update primitive and the per-message union
        // stays idempotent under races with other clients.
        for (message_id, read_by) in self.store.receipts_needed(self.actor.user_id) {
            actions.push(SyncAction::PersistReadBy { message_id, read_by });
        }

        actions.push(SyncAction::Render);
        actions
    }

    fn handle_history_failed(&mut self, room_id: RoomId, reason: &str) -> Vec<SyncAction> {
        if self.phase != (Phase::Loading { room_id }) {
            return vec![];
        }

        // Degrade: the room stays selected with an empty view and no
        // feeds; re-selecting it retries the whole activation.
        tracing::warn!(room_id, reason, "history load failed");
        self.phase = Phase::Live { room_id, realtime: false };
        vec![SyncAction::Warn { reason: "Failed to load messages".into() }, SyncAction::Render]
    }

    fn handle_feeds_opened(&mut self, room_id: RoomId) -> Vec<SyncAction> {
        if self.phase != (Phase::Loading { room_id }) {
            tracing::debug!(room_id, "discarding stale feed-open confirmation");
            return vec![];
        }
        self.phase = Phase::Live { room_id, realtime: true };
        vec![SyncAction::Render]
    }

    fn handle_feeds_failed(&mut self, room_id: RoomId, reason: String) -> Vec<SyncAction> {
        match self.phase {
            Phase::Loading { room_id: current } | Phase::Live { room_id: current, .. }
                if current == room_id =>
            {
                tracing::warn!(room_id, %reason, "live subscription unavailable");
                self.phase = Phase::Live { room_id, realtime: false };
                vec![
                    SyncAction::Warn { reason: "Live updates unavailable for this room".into() },
                    SyncAction::Render,
                ]
            },
            _ => vec![],
        }
    }

    fn handle_feeds_closed(&mut self, room_id: RoomId) -> Vec<SyncAction> {
        match self.phase {
            Phase::Closing { room_id: current, next } if current == room_id => match next {
                Some(next_room) => {
                    self.begin_loading(next_room);
                    vec![SyncAction::LoadHistory { room_id: next_room }, SyncAction::Render]
                },
                None => {
                    self.phase = Phase::Idle;
                    vec![SyncAction::Render]
                },
            },
            // An unsolicited close while live means the backend dropped
            // the feed underneath us: degrade rather than pretend.
            Phase::Live { room_id: current, realtime: true } if current == room_id => {
                tracing::warn!(room_id, "live feed closed by backend");
                self.phase = Phase::Live { room_id, realtime: false };
                self.roster.clear();
                vec![
                    SyncAction::Warn { reason: "Live updates unavailable for this room".into() },
                    SyncAction::Render,
                ]
            },
            _ => vec![],
        }
    }

    fn handle_insert(&mut self, room_id: RoomId, row: Message) -> Vec<SyncAction> {
        if !self.is_live_for(room_id) {
            tracing::debug!(room_id, "discarding insert for inactive room");
            return vec![];
        }

        let sender_id = row.sender_id;
        let sender_known = self.profiles.contains(sender_id);
        let auto_read = sender_id != self.actor.user_id;
        let read_by = receipts::with_reader(&row.read_by, self.actor.user_id);
        let message_id = row.id;

        if !self.store.apply_insert(row, &self.profiles) {
            return vec![];
        }

        let mut actions = Vec::new();
        if !sender_known {
            actions.push(SyncAction::LoadProfiles { users: vec![sender_id] });
        }
        if auto_read {
            // Auto-read-on-arrival: the room is open, so the new message
            // is immediately seen. Local state is patched when the
            // resulting update event comes back.
            actions.push(SyncAction::PersistReadBy { message_id, read_by });
        }
        actions.push(SyncAction::Render);
        actions
    }

    fn handle_update(&mut self, room_id: RoomId, row: &Message) -> Vec<SyncAction> {
        if !self.is_live_for(room_id) {
            return vec![];
        }
        if self.store.apply_update(row) { vec![SyncAction::Render] } else { vec![] }
    }

    fn handle_profiles_loaded(&mut self, profiles: Vec<Profile>) -> Vec<SyncAction> {
        if profiles.is_empty() {
            return vec![];
        }
        for profile in &profiles {
            self.store.attach_profile(profile);
        }
        self.profiles.extend(profiles);
        vec![SyncAction::Render]
    }

    fn handle_presence(&mut self, room_id: RoomId, snapshot: &[(UserId, bool)]) -> Vec<SyncAction> {
        if !self.is_live_for(room_id) {
            return vec![];
        }
        self.roster.apply_snapshot(snapshot);
        vec![SyncAction::Render]
    }

    fn handle_composer(&mut self, empty: bool, now: I) -> Vec<SyncAction> {
        let Phase::Live { room_id, realtime: true } = self.phase else {
            return vec![];
        };
        match self.typing.composer_changed(empty, now) {
            Some(transition) => vec![SyncAction::PublishTyping {
                room_id,
                typing: transition == TypingTransition::Started,
            }],
            None => vec![],
        }
    }

    fn handle_tick(&mut self, now: I) -> Vec<SyncAction> {
        let Phase::Live { room_id, realtime: true } = self.phase else {
            return vec![];
        };
        match self.typing.poll(now) {
            Some(TypingTransition::Stopped) => {
                vec![SyncAction::PublishTyping { room_id, typing: false }]
            },
            _ => vec![],
        }
    }

    fn handle_send(&mut self, body: &str, now: I) -> Result<Vec<SyncAction>, SyncError> {
        let room_id = match self.phase {
            Phase::Loading { room_id } | Phase::Live { room_id, .. } => room_id,
            Phase::Idle | Phase::Closing { .. } => return Err(SyncError::NoActiveRoom),
        };

        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Ok(vec![]);
        }

        let mut actions =
            vec![SyncAction::PersistMessage { room_id, body: trimmed.to_owned() }];

        // Sending clears the composer, which ends the typing indicator.
        if let Some(TypingTransition::Stopped) = self.typing.composer_changed(true, now) {
            actions.push(SyncAction::PublishTyping { room_id, typing: false });
        }

        Ok(actions)
    }

    /// Whether `room_id` is live with feeds delivering. Degraded rooms
    /// (`realtime: false`) have no open feeds, so anything that still
    /// arrives for them is stale and gets discarded.
    fn is_live_for(&self, room_id: RoomId) -> bool {
        matches!(
            self.phase,
            Phase::Live { room_id: current, realtime: true } if current == room_id
        )
    }

    fn begin_loading(&mut self, room_id: RoomId) {
        self.clear_room_state();
        self.phase = Phase::Loading { room_id };
    }

    fn begin_closing(&mut self, room_id: RoomId, next: Option<RoomId>) {
        self.clear_room_state();
        self.phase = Phase::Closing { room_id, next };
    }

    /// Per-room state never survives a switch: the store, the roster, and
    /// the local typing debounce all reset together.
    fn clear_room_state(&mut self) {
        self.store.reset();
        self.roster.clear();
        self.typing.reset();
    }
}
