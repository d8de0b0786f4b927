//! Room visibility scenarios across the two roles.

use std::sync::Arc;

use lyceum_client::{SyncConfig, SyncRuntime};
use lyceum_core::{Profile, Role, RoomKind};
use lyceum_harness::{MemoryBackend, MemoryPlatform};

const ADMIN: u64 = 1;
const STUDENT1: u64 = 2;
const STUDENT2: u64 = 3;

fn profile(user_id: u64, full_name: &str, email: &str) -> Profile {
    Profile { user_id, full_name: Some(full_name.into()), email: email.into() }
}

fn seeded_platform() -> MemoryPlatform {
    let platform = MemoryPlatform::new();
    platform.add_account(profile(ADMIN, "Admin", "admin@x.com"), Role::Admin);
    platform.add_account(profile(STUDENT1, "Student One", "s1@x.com"), Role::User);
    platform.add_account(profile(STUDENT2, "Student Two", "s2@x.com"), Role::User);

    platform.add_room("General Announcements", RoomKind::AdminAllUsers, None);
    platform.add_room("Student Lounge", RoomKind::AllUsers, None);
    platform.add_room("admin_s1@x.com", RoomKind::UserAdmin, None);
    platform.add_room("admin_s2@x.com", RoomKind::UserAdmin, None);
    platform
}

async fn login(platform: &MemoryPlatform, user: u64) -> SyncRuntime<MemoryBackend> {
    SyncRuntime::login(Arc::new(platform.client(user)), SyncConfig::default())
        .await
        .expect("login failed")
}

#[tokio::test]
async fn student_sees_broadcasts_and_exactly_their_scoped_room() {
    let platform = seeded_platform();
    let runtime = login(&platform, STUDENT1).await;

    let names: Vec<&str> = runtime.rooms().iter().map(|v| v.room.name.as_str()).collect();
    assert_eq!(names, vec!["General Announcements", "Student Lounge", "admin_s1@x.com"]);
}

#[tokio::test]
async fn student_never_sees_another_students_scoped_room() {
    let platform = seeded_platform();
    let runtime = login(&platform, STUDENT2).await;

    assert!(runtime.rooms().iter().all(|v| v.room.name != "admin_s1@x.com"));
    assert!(runtime.rooms().iter().any(|v| v.room.name == "admin_s2@x.com"));
}

#[tokio::test]
async fn admin_sees_every_room_except_the_commons_with_resolved_labels() {
    let platform = seeded_platform();
    let runtime = login(&platform, ADMIN).await;

    let labels: Vec<&str> = runtime.rooms().iter().map(|v| v.display_name.as_str()).collect();
    assert_eq!(labels, vec![
        "Admin & All Users",
        "Chat with User: Student One",
        "Chat with User: Student Two",
    ]);
}

#[tokio::test]
async fn scoped_room_with_explicit_owner_resolves_without_name_match() {
    let platform = seeded_platform();
    // A migrated room whose name no longer embeds anything useful.
    platform.add_room("direct-7f3a", RoomKind::UserAdmin, Some(STUDENT1));

    let runtime = login(&platform, STUDENT1).await;
    assert!(runtime.rooms().iter().any(|v| v.room.name == "direct-7f3a"));

    let other = login(&platform, STUDENT2).await;
    assert!(other.rooms().iter().all(|v| v.room.name != "direct-7f3a"));
}

#[tokio::test]
async fn unknown_account_cannot_log_in() {
    let platform = seeded_platform();
    let result = SyncRuntime::login(Arc::new(platform.client(99)), SyncConfig::default()).await;
    assert!(result.is_err());
}
