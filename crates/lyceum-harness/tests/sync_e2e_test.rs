//! End-to-end synchronization scenarios: history round trips, live
//! delivery with auto-read receipts, and teardown on room switch.

use std::{sync::Arc, time::Duration};

use lyceum_client::{Backend, Phase, SyncConfig, SyncRuntime};
use lyceum_core::{Profile, Role, RoomId, RoomKind};
use lyceum_harness::{MemoryBackend, MemoryPlatform};

const ADMIN: u64 = 1;
const STUDENT: u64 = 2;

fn profile(user_id: u64, full_name: &str, email: &str) -> Profile {
    Profile { user_id, full_name: Some(full_name.into()), email: email.into() }
}

fn seeded_platform() -> (MemoryPlatform, RoomId) {
    let platform = MemoryPlatform::new();
    platform.add_account(profile(ADMIN, "Admin", "admin@x.com"), Role::Admin);
    platform.add_account(profile(STUDENT, "Student One", "s1@x.com"), Role::User);
    let room = platform.add_room("admin_s1@x.com", RoomKind::UserAdmin, None);
    (platform, room)
}

async fn login(platform: &MemoryPlatform, user: u64) -> SyncRuntime<MemoryBackend> {
    SyncRuntime::login(Arc::new(platform.client(user)), SyncConfig::default())
        .await
        .expect("login failed")
}

/// Process the next queued event, failing the test if none arrives.
async fn step(runtime: &mut SyncRuntime<MemoryBackend>) {
    let processed = tokio::time::timeout(Duration::from_secs(2), runtime.step())
        .await
        .expect("timed out waiting for an event");
    assert!(processed);
}

#[tokio::test(flavor = "multi_thread")]
async fn history_round_trips_in_creation_order() {
    let (platform, room) = seeded_platform();
    let seeder = platform.client(ADMIN);
    for i in 0..5 {
        seeder.insert_message(room, ADMIN, &format!("msg {i}")).await.expect("seed failed");
    }

    let mut student = login(&platform, STUDENT).await;
    student.select_room(room).await;

    assert_eq!(student.session().phase(), Phase::Live { room_id: room, realtime: true });
    let bodies: Vec<&str> =
        student.session().store().messages().iter().map(|m| m.message.body.as_str()).collect();
    assert_eq!(bodies, vec!["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn live_insert_is_appended_enriched_and_auto_read() {
    let (platform, room) = seeded_platform();
    let mut student = login(&platform, STUDENT).await;
    student.select_room(room).await;

    let admin = platform.client(ADMIN);
    admin.insert_message(room, ADMIN, "Hello M1").await.expect("send failed");

    // First event: the insert. Appended with the sender's reader set and
    // the profile resolved through the cache; the auto-receipt write goes
    // out in the same cycle.
    step(&mut student).await;
    {
        let messages = student.session().store().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message.body, "Hello M1");
        assert_eq!(messages[0].sender.as_ref().map(Profile::label), Some("Admin"));
    }
    let stored = platform.messages_in(room);
    assert_eq!(stored[0].read_by, vec![ADMIN, STUDENT]);

    // Second event: the reader-set update comes back through the feed and
    // patches the local row without a reload.
    step(&mut student).await;
    let messages = student.session().store().messages();
    assert_eq!(messages[0].message.read_by, vec![ADMIN, STUDENT]);
}

#[tokio::test(flavor = "multi_thread")]
async fn opening_a_room_catches_up_read_state() {
    let (platform, room) = seeded_platform();
    let admin = platform.client(ADMIN);
    admin.insert_message(room, ADMIN, "before open").await.expect("seed failed");

    let mut student = login(&platform, STUDENT).await;
    student.select_room(room).await;

    // The bulk catch-up wrote the receipt during activation.
    let stored = platform.messages_in(room);
    assert_eq!(stored[0].read_by, vec![ADMIN, STUDENT]);

    // The echo of that write patches local state.
    step(&mut student).await;
    assert_eq!(
        student.session().store().messages()[0].message.read_by,
        vec![ADMIN, STUDENT]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn own_messages_round_trip_without_receipts() {
    let (platform, room) = seeded_platform();
    let mut student = login(&platform, STUDENT).await;
    student.select_room(room).await;

    student.send_message("  hi there  ").await.expect("send failed");

    // The echo arrives through the feed; no auto-receipt for own rows.
    step(&mut student).await;
    let messages = student.session().store().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].message.body, "hi there");
    assert_eq!(messages[0].message.read_by, vec![STUDENT]);
    assert_eq!(platform.messages_in(room)[0].read_by, vec![STUDENT]);
}

#[tokio::test(flavor = "multi_thread")]
async fn switching_rooms_leaves_no_subscriptions_behind() {
    let (platform, room_a) = seeded_platform();
    let room_b = platform.add_room("General Announcements", RoomKind::AdminAllUsers, None);

    let mut admin = login(&platform, ADMIN).await;
    admin.select_room(room_a).await;

    let mut student = login(&platform, STUDENT).await;
    student.select_room(room_a).await;
    assert_eq!(platform.message_subscriber_count(room_a), 2);

    student.select_room(room_b).await;
    assert_eq!(student.session().phase(), Phase::Live { room_id: room_b, realtime: true });
    assert!(student.session().store().is_empty());

    // A probe write flushes dead subscriptions: only the admin remains.
    let seeder = platform.client(ADMIN);
    seeder.insert_message(room_a, ADMIN, "probe").await.expect("probe failed");
    assert_eq!(platform.message_subscriber_count(room_a), 1);

    // Nothing from room A reaches the student after the switch.
    student.pump().await;
    assert_eq!(student.session().store().room(), Some(room_b));
    assert!(student.session().store().is_empty());

    // The presence membership for room A drains too.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(platform.presence_members(room_a), vec![ADMIN]);
}

#[tokio::test(flavor = "multi_thread")]
async fn closing_the_session_releases_everything() {
    let (platform, room) = seeded_platform();
    let mut student = login(&platform, STUDENT).await;
    student.select_room(room).await;

    student.close().await;
    assert_eq!(student.session().phase(), Phase::Idle);

    let seeder = platform.client(ADMIN);
    seeder.insert_message(room, ADMIN, "probe").await.expect("probe failed");
    assert_eq!(platform.message_subscriber_count(room), 0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(platform.presence_members(room).is_empty());
}
