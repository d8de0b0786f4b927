//! Typing-indicator scenarios over the presence channel.

use std::{sync::Arc, time::Duration};

use lyceum_client::{SyncConfig, SyncRuntime};
use lyceum_core::{Profile, Role, RoomId, RoomKind};
use lyceum_harness::{MemoryBackend, MemoryPlatform};

const STUDENT1: u64 = 2;
const STUDENT2: u64 = 3;

fn profile(user_id: u64, email: &str) -> Profile {
    Profile { user_id, full_name: None, email: email.into() }
}

fn seeded_platform() -> (MemoryPlatform, RoomId) {
    let platform = MemoryPlatform::new();
    platform.add_account(profile(STUDENT1, "s1@x.com"), Role::User);
    platform.add_account(profile(STUDENT2, "s2@x.com"), Role::User);
    let room = platform.add_room("Student Lounge", RoomKind::AllUsers, None);
    (platform, room)
}

async fn login(platform: &MemoryPlatform, user: u64) -> SyncRuntime<MemoryBackend> {
    SyncRuntime::login(Arc::new(platform.client(user)), SyncConfig::default())
        .await
        .expect("login failed")
}

/// Process queued events until the runtime has been quiet for a while,
/// counting edges of "some peer is typing".
async fn observe_typing_edges(runtime: &mut SyncRuntime<MemoryBackend>) -> (usize, usize) {
    let mut rises = 0;
    let mut falls = 0;
    let mut was_typing = !runtime.session().typing_peers().is_empty();

    while let Ok(processed) =
        tokio::time::timeout(Duration::from_millis(300), runtime.step()).await
    {
        assert!(processed);
        let now_typing = !runtime.session().typing_peers().is_empty();
        if now_typing && !was_typing {
            rises += 1;
        }
        if !now_typing && was_typing {
            falls += 1;
        }
        was_typing = now_typing;
    }

    (rises, falls)
}

#[tokio::test(flavor = "multi_thread")]
async fn keystroke_burst_is_observed_as_one_transition_each_way() {
    let (platform, room) = seeded_platform();

    let mut writer = login(&platform, STUDENT1).await;
    writer.select_room(room).await;

    let mut observer = login(&platform, STUDENT2).await;
    observer.select_room(room).await;

    // A continuous burst of keystrokes, then the send clears the
    // composer.
    for _ in 0..8 {
        writer.composer_changed(false).await;
    }
    writer.send_message("done typing").await.expect("send failed");

    let (rises, falls) = observe_typing_edges(&mut observer).await;
    assert_eq!((rises, falls), (1, 1));
    assert!(observer.session().typing_peers().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn clearing_the_composer_stops_the_indicator() {
    let (platform, room) = seeded_platform();

    let mut writer = login(&platform, STUDENT1).await;
    writer.select_room(room).await;

    let mut observer = login(&platform, STUDENT2).await;
    observer.select_room(room).await;

    writer.composer_changed(false).await;
    writer.composer_changed(true).await;

    let (rises, falls) = observe_typing_edges(&mut observer).await;
    assert_eq!((rises, falls), (1, 1));
}

#[tokio::test(flavor = "multi_thread")]
async fn typing_state_clears_when_the_writer_leaves() {
    let (platform, room) = seeded_platform();
    let lounge_b = platform.add_room("Lounge B", RoomKind::AllUsers, None);

    let mut writer = login(&platform, STUDENT1).await;
    writer.select_room(room).await;

    let mut observer = login(&platform, STUDENT2).await;
    observer.select_room(room).await;

    writer.composer_changed(false).await;

    // The writer switches rooms mid-typing; leaving the presence channel
    // clears their entry for everyone still in the room.
    writer.select_room(lounge_b).await;

    let (rises, falls) = observe_typing_edges(&mut observer).await;
    assert_eq!((rises, falls), (1, 1));
    assert!(observer.session().typing_peers().is_empty());
}
