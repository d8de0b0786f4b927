//! In-memory backend implementation.
//!
//! All state lives in one locked world shared by every client handle.
//! Uses `lock().expect()` which will panic if the mutex is poisoned -
//! acceptable for test code. Time is a logical clock advanced on every
//! write, so tests are deterministic and never read the wall clock.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use lyceum_client::{
    Backend, BackendError, MessageChange, MessageFeed, NotificationChange, NotificationFeed,
    PresenceChannel, PresenceSnapshot,
};
use lyceum_core::{
    Message, MessageId, Notification, NotificationId, NotificationKind, Profile, Role, Room,
    RoomId, RoomKind, UserId,
};
use tokio::sync::mpsc;

/// One-shot failure switches, consumed by the next matching call.
#[derive(Debug, Default)]
struct Faults {
    load_messages: bool,
    subscribe_messages: bool,
    insert_message: bool,
    update_read_by: bool,
    mark_notifications_read: bool,
}

/// Shared world state behind the platform.
struct World {
    /// Logical clock in milliseconds; advanced on every write.
    clock: u64,
    next_id: u128,
    profiles: Vec<Profile>,
    roles: HashMap<UserId, Role>,
    rooms: Vec<Room>,
    messages: Vec<Message>,
    notifications: Vec<Notification>,
    message_subs: HashMap<RoomId, Vec<mpsc::UnboundedSender<MessageChange>>>,
    notification_subs: Vec<(UserId, mpsc::UnboundedSender<NotificationChange>)>,
    presence: HashMap<RoomId, BTreeMap<UserId, bool>>,
    presence_subs: HashMap<RoomId, Vec<(UserId, mpsc::UnboundedSender<PresenceSnapshot>)>>,
    faults: Faults,
}

impl World {
    fn new() -> Self {
        Self {
            clock: 1_000,
            next_id: 1,
            profiles: Vec::new(),
            roles: HashMap::new(),
            rooms: Vec::new(),
            messages: Vec::new(),
            notifications: Vec::new(),
            message_subs: HashMap::new(),
            notification_subs: Vec::new(),
            presence: HashMap::new(),
            presence_subs: HashMap::new(),
            faults: Faults::default(),
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn assign_id(&mut self) -> u128 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Deliver a message change to the room's living subscribers,
    /// pruning any whose receiving side has been dropped.
    fn broadcast_message(&mut self, room: RoomId, change: &MessageChange) {
        if let Some(subs) = self.message_subs.get_mut(&room) {
            subs.retain(|tx| tx.send(change.clone()).is_ok());
        }
    }

    /// Deliver a notification change under row-level visibility: the
    /// owning user sees it, and so does every admin subscriber.
    fn broadcast_notification(&mut self, row_owner: UserId, change: &NotificationChange) {
        let roles = &self.roles;
        self.notification_subs.retain(|(sub_user, tx)| {
            let visible =
                *sub_user == row_owner || roles.get(sub_user) == Some(&Role::Admin);
            if visible { tx.send(change.clone()).is_ok() } else { true }
        });
    }

    /// Deliver the room's current presence snapshot to every tracker.
    fn broadcast_presence(&mut self, room: RoomId) {
        let snapshot: PresenceSnapshot = self
            .presence
            .get(&room)
            .map(|entries| entries.iter().map(|(&user, &typing)| (user, typing)).collect())
            .unwrap_or_default();

        if let Some(subs) = self.presence_subs.get_mut(&room) {
            subs.retain(|(_, tx)| tx.send(snapshot.clone()).is_ok());
        }
    }
}

/// A shared in-memory platform. Clone handles are cheap and all observe
/// the same world.
#[derive(Clone)]
pub struct MemoryPlatform {
    world: Arc<Mutex<World>>,
}

impl MemoryPlatform {
    /// Create an empty platform.
    pub fn new() -> Self {
        Self { world: Arc::new(Mutex::new(World::new())) }
    }

    /// Register an account with the given role.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn add_account(&self, profile: Profile, role: Role) {
        let mut world = self.world.lock().expect("Mutex poisoned");
        world.roles.insert(profile.user_id, role);
        world.profiles.push(profile);
    }

    /// Create a room and return its id.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn add_room(&self, name: &str, kind: RoomKind, owner: Option<UserId>) -> RoomId {
        let mut world = self.world.lock().expect("Mutex poisoned");
        let id = world.assign_id();
        let created_at = world.tick();
        world.rooms.push(Room { id, name: name.to_owned(), kind, owner, created_at });
        id
    }

    /// Insert a notification row and deliver the change to visible
    /// subscribers.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn add_notification(
        &self,
        user: UserId,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) -> NotificationId {
        let mut world = self.world.lock().expect("Mutex poisoned");
        let id = world.assign_id();
        let created_at = world.tick();
        let row = Notification {
            id,
            user_id: user,
            kind,
            title: title.to_owned(),
            message: message.to_owned(),
            link: None,
            read: false,
            created_at,
        };
        world.notifications.push(row.clone());
        world.broadcast_notification(user, &NotificationChange::Inserted(row));
        id
    }

    /// A client handle authenticated as `user`.
    pub fn client(&self, user: UserId) -> MemoryBackend {
        MemoryBackend { world: Arc::clone(&self.world), actor: user }
    }

    /// Message rows currently stored for a room, in creation order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn messages_in(&self, room: RoomId) -> Vec<Message> {
        let world = self.world.lock().expect("Mutex poisoned");
        world.messages.iter().filter(|m| m.room_id == room).cloned().collect()
    }

    /// Number of live message subscriptions for a room. Dead
    /// subscriptions are detected on delivery, so callers should send a
    /// probe message first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn message_subscriber_count(&self, room: RoomId) -> usize {
        let world = self.world.lock().expect("Mutex poisoned");
        world.message_subs.get(&room).map_or(0, Vec::len)
    }

    /// Identities currently tracked on a room's presence channel.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn presence_members(&self, room: RoomId) -> Vec<UserId> {
        let world = self.world.lock().expect("Mutex poisoned");
        world.presence.get(&room).map_or_else(Vec::new, |m| m.keys().copied().collect())
    }

    /// Fail the next history load with a network error.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn fail_next_load_messages(&self) {
        self.world.lock().expect("Mutex poisoned").faults.load_messages = true;
    }

    /// Fail the next message-feed subscription with a network error.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn fail_next_subscribe_messages(&self) {
        self.world.lock().expect("Mutex poisoned").faults.subscribe_messages = true;
    }

    /// Fail the next message insert with a rejected write.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn fail_next_insert_message(&self) {
        self.world.lock().expect("Mutex poisoned").faults.insert_message = true;
    }

    /// Fail the next reader-set write with a network error.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn fail_next_update_read_by(&self) {
        self.world.lock().expect("Mutex poisoned").faults.update_read_by = true;
    }

    /// Fail the next notification mark-read with a network error.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn fail_next_mark_notifications_read(&self) {
        self.world.lock().expect("Mutex poisoned").faults.mark_notifications_read = true;
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

/// A client handle bound to one authenticated identity.
#[derive(Clone)]
pub struct MemoryBackend {
    world: Arc<Mutex<World>>,
    actor: UserId,
}

#[async_trait]
impl Backend for MemoryBackend {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn current_user(&self) -> Result<(Profile, Role), BackendError> {
        let world = self.world.lock().expect("Mutex poisoned");
        let profile = world
            .profiles
            .iter()
            .find(|p| p.user_id == self.actor)
            .cloned()
            .ok_or(BackendError::Unauthenticated)?;
        let role = *world.roles.get(&self.actor).ok_or(BackendError::Unauthenticated)?;
        Ok((profile, role))
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn list_rooms(&self) -> Result<Vec<Room>, BackendError> {
        Ok(self.world.lock().expect("Mutex poisoned").rooms.clone())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError> {
        Ok(self.world.lock().expect("Mutex poisoned").profiles.clone())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn load_messages(&self, room: RoomId) -> Result<Vec<Message>, BackendError> {
        let mut world = self.world.lock().expect("Mutex poisoned");
        if world.faults.load_messages {
            world.faults.load_messages = false;
            return Err(BackendError::Network { reason: "history fetch timed out".into() });
        }
        Ok(world.messages.iter().filter(|m| m.room_id == room).cloned().collect())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn load_profiles(&self, users: &[UserId]) -> Result<Vec<Profile>, BackendError> {
        let world = self.world.lock().expect("Mutex poisoned");
        Ok(world.profiles.iter().filter(|p| users.contains(&p.user_id)).cloned().collect())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn insert_message(
        &self,
        room: RoomId,
        sender: UserId,
        body: &str,
    ) -> Result<(), BackendError> {
        let mut world = self.world.lock().expect("Mutex poisoned");
        if world.faults.insert_message {
            world.faults.insert_message = false;
            return Err(BackendError::Rejected { reason: "row-level security".into() });
        }
        if !world.rooms.iter().any(|r| r.id == room) {
            return Err(BackendError::NotFound { what: format!("room {room}") });
        }

        let id = world.assign_id();
        let created_at = world.tick();
        let row = Message {
            id,
            room_id: room,
            sender_id: sender,
            body: body.to_owned(),
            created_at,
            read_by: vec![sender],
        };
        world.messages.push(row.clone());
        world.broadcast_message(room, &MessageChange::Inserted(row));
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn update_read_by(
        &self,
        message: MessageId,
        read_by: &[UserId],
    ) -> Result<(), BackendError> {
        let mut world = self.world.lock().expect("Mutex poisoned");
        if world.faults.update_read_by {
            world.faults.update_read_by = false;
            return Err(BackendError::Network { reason: "write timed out".into() });
        }

        let Some(index) = world.messages.iter().position(|m| m.id == message) else {
            return Err(BackendError::NotFound { what: format!("message {message}") });
        };
        // Last write wins at the row level, as the platform behaves.
        world.messages[index].read_by = read_by.to_vec();
        let row = world.messages[index].clone();
        world.broadcast_message(row.room_id, &MessageChange::Updated(row));
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn load_notifications(&self, user: UserId) -> Result<Vec<Notification>, BackendError> {
        let world = self.world.lock().expect("Mutex poisoned");
        Ok(world.notifications.iter().filter(|n| n.user_id == user).cloned().collect())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn mark_notifications_read(
        &self,
        user: UserId,
        kind: NotificationKind,
    ) -> Result<(), BackendError> {
        let mut world = self.world.lock().expect("Mutex poisoned");
        if world.faults.mark_notifications_read {
            world.faults.mark_notifications_read = false;
            return Err(BackendError::Network { reason: "write timed out".into() });
        }

        let mut changed = Vec::new();
        for row in &mut world.notifications {
            if row.user_id == user && row.kind == kind && !row.read {
                row.read = true;
                changed.push(row.clone());
            }
        }
        for row in changed {
            world.broadcast_notification(user, &NotificationChange::Updated(row));
        }
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn subscribe_messages(&self, room: RoomId) -> Result<MessageFeed, BackendError> {
        let mut world = self.world.lock().expect("Mutex poisoned");
        if world.faults.subscribe_messages {
            world.faults.subscribe_messages = false;
            return Err(BackendError::Network { reason: "channel open failed".into() });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        world.message_subs.entry(room).or_default().push(tx);
        Ok(MessageFeed::new(rx))
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn subscribe_notifications(
        &self,
        user: UserId,
    ) -> Result<NotificationFeed, BackendError> {
        let mut world = self.world.lock().expect("Mutex poisoned");
        let (tx, rx) = mpsc::unbounded_channel();
        world.notification_subs.push((user, tx));
        Ok(NotificationFeed::new(rx))
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn join_presence(
        &self,
        room: RoomId,
        user: UserId,
    ) -> Result<PresenceChannel, BackendError> {
        let (publish_tx, mut publish_rx) = mpsc::unbounded_channel::<bool>();
        let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel();

        {
            let mut world = self.world.lock().expect("Mutex poisoned");
            world.presence.entry(room).or_default().insert(user, false);
            world.presence_subs.entry(room).or_default().push((user, snapshot_tx));
            world.broadcast_presence(room);
        }

        // Own the publish side: apply typing updates while the channel is
        // open, clear the entry once the handle is dropped.
        let world = Arc::clone(&self.world);
        tokio::spawn(async move {
            while let Some(typing) = publish_rx.recv().await {
                let mut world = world.lock().expect("Mutex poisoned");
                if let Some(entries) = world.presence.get_mut(&room) {
                    entries.insert(user, typing);
                }
                world.broadcast_presence(room);
            }

            let mut world = world.lock().expect("Mutex poisoned");
            if let Some(entries) = world.presence.get_mut(&room) {
                entries.remove(&user);
            }
            if let Some(subs) = world.presence_subs.get_mut(&room) {
                subs.retain(|(sub_user, _)| *sub_user != user);
            }
            world.broadcast_presence(room);
        });

        Ok(PresenceChannel::new(publish_tx, snapshot_rx))
    }
}
