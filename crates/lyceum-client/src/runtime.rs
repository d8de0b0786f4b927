//! Runtime orchestration.
//!
//! [`SyncRuntime`] binds the sans-IO [`ChatSession`] to a [`Backend`]:
//! it executes the actions the session produces, feeds completions back
//! in as events, and owns the forwarding tasks that turn live feed
//! deliveries into session events. It also owns the pieces that live
//! outside the room lifecycle: the visible-room list, the notification
//! ledger with its badge counts, and the alert/notice queues the UI
//! drains.
//!
//! The action loop mirrors the orchestration pattern used across this
//! workspace: drain the pending actions, let each resulting event
//! produce more actions, repeat until quiescent.

use std::{sync::Arc, time::Instant};

use lyceum_core::{
    Alert, NotificationKind, NotificationLedger, Profile, Role, RoomId, RoomView, UnreadCounts,
    UserId, alert_for, should_alert, visible_rooms,
};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    Backend, BackendError, ChatSession, MessageChange, MessageFeed, NotificationChange,
    PresenceSnapshot, SyncAction, SyncConfig, SyncError, SyncEvent,
};

/// Handles for the active room's live subscriptions.
///
/// Dropping this aborts both forwarding tasks and releases the presence
/// membership (the publisher half closes), which is what guarantees
/// teardown on every exit path.
struct ActiveFeeds {
    room_id: RoomId,
    publisher: mpsc::UnboundedSender<bool>,
    message_task: JoinHandle<()>,
    presence_task: JoinHandle<()>,
}

impl ActiveFeeds {
    fn publish(&self, typing: bool) {
        if self.publisher.send(typing).is_err() {
            tracing::debug!(room_id = self.room_id, "presence channel already closed");
        }
    }
}

impl Drop for ActiveFeeds {
    fn drop(&mut self) {
        self.message_task.abort();
        self.presence_task.abort();
    }
}

/// Orchestrates one actor's synchronizer against a backend.
pub struct SyncRuntime<B: Backend> {
    backend: Arc<B>,
    session: ChatSession,
    rooms: Vec<RoomView>,
    ledger: NotificationLedger,
    alerts: Vec<Alert>,
    notices: Vec<String>,
    renders: u64,
    events_tx: mpsc::UnboundedSender<SyncEvent>,
    events_rx: mpsc::UnboundedReceiver<SyncEvent>,
    feeds: Option<ActiveFeeds>,
    notifications_task: Option<JoinHandle<()>>,
}

impl<B: Backend> SyncRuntime<B> {
    /// Authenticate against the backend and bring up a runtime for the
    /// current actor: resolve the visible rooms, load the notification
    /// ledger, and subscribe to notification changes.
    ///
    /// # Errors
    ///
    /// Fails when authentication or the initial room-catalog fetch fails.
    /// Notification failures are non-fatal and only logged.
    pub async fn login(backend: Arc<B>, config: SyncConfig) -> Result<Self, BackendError> {
        let (profile, role) = backend.current_user().await?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let ledger = NotificationLedger::new(profile.user_id);

        let mut runtime = Self {
            backend,
            session: ChatSession::new(profile, role, config),
            rooms: Vec::new(),
            ledger,
            alerts: Vec::new(),
            notices: Vec::new(),
            renders: 0,
            events_tx,
            events_rx,
            feeds: None,
            notifications_task: None,
        };

        runtime.refresh_rooms().await?;
        runtime.start_notifications().await;
        Ok(runtime)
    }

    /// The actor this runtime synchronizes for.
    pub fn actor(&self) -> &Profile {
        self.session.actor()
    }

    /// The actor's role.
    pub fn role(&self) -> Role {
        self.session.role()
    }

    /// The session state machine, for rendering.
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Rooms visible to the actor, in creation order.
    pub fn rooms(&self) -> &[RoomView] {
        &self.rooms
    }

    /// Current notification badge counts.
    pub fn unread_counts(&self) -> UnreadCounts {
        self.ledger.counts()
    }

    /// Number of render requests so far. Monotone; a UI re-renders
    /// whenever this advances.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    /// Drain pending alerts for the UI to display.
    pub fn take_alerts(&mut self) -> Vec<Alert> {
        std::mem::take(&mut self.alerts)
    }

    /// Drain pending transient notices for the UI to display.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    /// Reload the room catalog and recompute visibility. Called once at
    /// login and again on demand (e.g. after a role change).
    pub async fn refresh_rooms(&mut self) -> Result<(), BackendError> {
        let catalog = self.backend.list_rooms().await?;

        let directory = if self.session.role() == Role::Admin {
            match self.backend.list_profiles().await {
                Ok(profiles) => profiles,
                Err(error) => {
                    tracing::warn!(%error, "profile directory unavailable, using raw room names");
                    Vec::new()
                },
            }
        } else {
            Vec::new()
        };

        self.rooms =
            visible_rooms(self.session.actor(), self.session.role(), &catalog, &directory);
        self.renders += 1;
        Ok(())
    }

    /// Activate a room: tear down the previous room's feeds, load
    /// history, open the new feeds.
    pub async fn select_room(&mut self, room_id: RoomId) {
        let actions = self.feed(SyncEvent::SelectRoom { room_id });
        self.dispatch(actions).await;
    }

    /// Send the composer contents to the active room.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NoActiveRoom`] when no room is selected.
    pub async fn send_message(&mut self, body: impl Into<String>) -> Result<(), SyncError> {
        let event = SyncEvent::SendMessage { body: body.into(), now: Instant::now() };
        let actions = self.session.handle(event)?;
        self.dispatch(actions).await;
        Ok(())
    }

    /// Report a composer input change for typing-indicator debouncing.
    pub async fn composer_changed(&mut self, empty: bool) {
        let actions = self.feed(SyncEvent::ComposerChanged { empty, now: Instant::now() });
        self.dispatch(actions).await;
    }

    /// Periodic tick; sweeps the typing idle deadline.
    pub async fn tick(&mut self) {
        let actions = self.feed(SyncEvent::Tick { now: Instant::now() });
        self.dispatch(actions).await;
    }

    /// Mark every unread notification of `kind` read, then recount from a
    /// fresh fetch. Failures surface as a transient notice.
    pub async fn mark_kind_read(&mut self, kind: NotificationKind) {
        let user = self.actor_id();
        if let Err(error) = self.backend.mark_notifications_read(user, kind).await {
            tracing::warn!(%error, "mark-read failed");
            self.notices.push("Failed to update notifications".into());
            return;
        }
        self.reload_notifications().await;
    }

    /// Wait for the next queued event and process it. Returns `false`
    /// only if the event channel is closed.
    pub async fn step(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.process(event).await;
                true
            },
            None => false,
        }
    }

    /// Process everything already queued without waiting.
    pub async fn pump(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.process(event).await;
        }
    }

    /// Leave the chat surface: tear down room feeds and stop the
    /// notification subscription.
    pub async fn close(&mut self) {
        let actions = self.feed(SyncEvent::CloseSession);
        self.dispatch(actions).await;
        if let Some(task) = self.notifications_task.take() {
            task.abort();
        }
    }

    fn actor_id(&self) -> UserId {
        self.session.actor().user_id
    }

    /// Route one event: notification changes stay in the runtime, all
    /// others drive the session machine.
    async fn process(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::NotificationChanged { change } => {
                self.on_notification_change(change).await;
            },
            other => {
                let actions = self.feed(other);
                self.dispatch(actions).await;
            },
        }
    }

    /// Hand an event to the session, logging misuse instead of bubbling:
    /// internally generated events can never be misuse.
    fn feed(&mut self, event: SyncEvent) -> Vec<SyncAction> {
        match self.session.handle(event) {
            Ok(actions) => actions,
            Err(error) => {
                tracing::warn!(%error, "session rejected event");
                Vec::new()
            },
        }
    }

    /// Execute actions until quiescent. Completions are fed straight back
    /// into the session and may produce further actions.
    async fn dispatch(&mut self, initial: Vec<SyncAction>) {
        let mut pending = initial;

        while !pending.is_empty() {
            let actions = std::mem::take(&mut pending);

            for action in actions {
                match action {
                    SyncAction::LoadHistory { room_id } => {
                        let event = match self.backend.load_messages(room_id).await {
                            Ok(rows) => SyncEvent::HistoryLoaded { room_id, rows },
                            Err(error) => {
                                SyncEvent::HistoryFailed { room_id, reason: error.to_string() }
                            },
                        };
                        pending.extend(self.feed(event));
                    },
                    SyncAction::OpenFeeds { room_id } => {
                        let event = self.open_feeds(room_id).await;
                        pending.extend(self.feed(event));
                    },
                    SyncAction::CloseFeeds { room_id } => {
                        self.feeds = None;
                        pending.extend(self.feed(SyncEvent::FeedsClosed { room_id }));
                    },
                    SyncAction::LoadProfiles { users } => {
                        let event = match self.backend.load_profiles(&users).await {
                            Ok(profiles) => SyncEvent::ProfilesLoaded { profiles },
                            Err(error) => {
                                SyncEvent::ProfilesFailed { users, reason: error.to_string() }
                            },
                        };
                        pending.extend(self.feed(event));
                    },
                    SyncAction::PersistMessage { room_id, body } => {
                        let sender = self.actor_id();
                        if let Err(error) =
                            self.backend.insert_message(room_id, sender, &body).await
                        {
                            let event =
                                SyncEvent::SendFailed { room_id, reason: error.to_string() };
                            pending.extend(self.feed(event));
                        }
                    },
                    SyncAction::PersistReadBy { message_id, read_by } => {
                        if let Err(error) =
                            self.backend.update_read_by(message_id, &read_by).await
                        {
                            let event =
                                SyncEvent::ReceiptFailed { message_id, reason: error.to_string() };
                            pending.extend(self.feed(event));
                        }
                    },
                    SyncAction::PublishTyping { room_id, typing } => {
                        if let Some(feeds) = &self.feeds
                            && feeds.room_id == room_id
                        {
                            feeds.publish(typing);
                        }
                    },
                    SyncAction::Render => self.renders += 1,
                    SyncAction::Warn { reason } => {
                        tracing::warn!(%reason, "transient notice");
                        self.notices.push(reason);
                    },
                }
            }
        }
    }

    /// Open the message feed and presence channel for `room_id` and spawn
    /// their forwarding tasks.
    async fn open_feeds(&mut self, room_id: RoomId) -> SyncEvent {
        // Session guarantees CloseFeeds before the next OpenFeeds, but a
        // leftover handle must never outlive its room.
        self.feeds = None;

        let feed = match self.backend.subscribe_messages(room_id).await {
            Ok(feed) => feed,
            Err(error) => {
                return SyncEvent::FeedsFailed { room_id, reason: error.to_string() };
            },
        };

        let presence = match self.backend.join_presence(room_id, self.actor_id()).await {
            Ok(channel) => channel,
            // Dropping `feed` here already releases the subscription.
            Err(error) => {
                return SyncEvent::FeedsFailed { room_id, reason: error.to_string() };
            },
        };

        let message_task = tokio::spawn(forward_messages(feed, room_id, self.events_tx.clone()));
        let (publisher, snapshots) = presence.split();
        let presence_task =
            tokio::spawn(forward_presence(snapshots, room_id, self.events_tx.clone()));

        self.feeds = Some(ActiveFeeds { room_id, publisher, message_task, presence_task });
        SyncEvent::FeedsOpened { room_id }
    }

    /// Refetch the actor's notifications and recount, queueing an alert
    /// for inserts the actor should see.
    async fn on_notification_change(&mut self, change: NotificationChange) {
        if let NotificationChange::Inserted(row) = &change
            && should_alert(self.session.role(), self.actor_id(), row)
        {
            self.alerts.push(alert_for(row));
        }

        self.reload_notifications().await;
    }

    async fn reload_notifications(&mut self) {
        match self.backend.load_notifications(self.actor_id()).await {
            Ok(rows) => {
                self.ledger.replace(rows);
                self.renders += 1;
            },
            Err(error) => tracing::warn!(%error, "notification refetch failed"),
        }
    }

    async fn start_notifications(&mut self) {
        self.reload_notifications().await;

        match self.backend.subscribe_notifications(self.actor_id()).await {
            Ok(mut feed) => {
                let tx = self.events_tx.clone();
                let task = tokio::spawn(async move {
                    while let Some(change) = feed.next().await {
                        if tx.send(SyncEvent::NotificationChanged { change }).is_err() {
                            break;
                        }
                    }
                });
                self.notifications_task = Some(task);
            },
            Err(error) => tracing::warn!(%error, "notification subscription unavailable"),
        }
    }
}

impl<B: Backend> Drop for SyncRuntime<B> {
    fn drop(&mut self) {
        if let Some(task) = self.notifications_task.take() {
            task.abort();
        }
        // `feeds` aborts its own tasks on drop.
    }
}

/// Forward message-feed deliveries into the event queue. When the backend
/// closes the feed, report it so the session can degrade.
async fn forward_messages(
    mut feed: MessageFeed,
    room_id: RoomId,
    tx: mpsc::UnboundedSender<SyncEvent>,
) {
    while let Some(change) = feed.next().await {
        let event = match change {
            MessageChange::Inserted(row) => SyncEvent::MessageInserted { room_id, row },
            MessageChange::Updated(row) => SyncEvent::MessageUpdated { room_id, row },
        };
        if tx.send(event).is_err() {
            return;
        }
    }
    let _ = tx.send(SyncEvent::FeedsClosed { room_id });
}

/// Forward presence snapshots into the event queue.
async fn forward_presence(
    mut snapshots: mpsc::UnboundedReceiver<PresenceSnapshot>,
    room_id: RoomId,
    tx: mpsc::UnboundedSender<SyncEvent>,
) {
    while let Some(snapshot) = snapshots.recv().await {
        if tx.send(SyncEvent::PresenceSynced { room_id, snapshot }).is_err() {
            return;
        }
    }
}
