//! Room visibility and display-name resolution.
//!
//! Computes, for an actor and role, the ordered list of rooms they may
//! see. Admins see every room except the users-only commons; users see the
//! broadcast rooms plus the single scoped room correlated to their own
//! identity.
//!
//! Correlation prefers the explicit `owner` link on the room row. Legacy
//! rows without one fall back to substring matching of the actor's name or
//! email against the stored room name, which is how the original schema
//! encoded ownership.

use crate::model::{Profile, Role, Room, RoomKind, UserId};

/// A visible room paired with the name the UI should display for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView {
    /// The underlying room row.
    pub room: Room,
    /// Resolved display name.
    pub display_name: String,
}

/// Whether a legacy scoped room's stored name correlates to `profile`.
///
/// Matches when the room name contains the profile's full name or email.
/// Substring matching can false-positive when one user's email is
/// contained in another's display name; rooms with an explicit `owner`
/// bypass this path entirely.
pub fn room_matches_profile(room_name: &str, profile: &Profile) -> bool {
    let name_match = profile
        .full_name
        .as_deref()
        .is_some_and(|name| !name.is_empty() && room_name.contains(name));
    name_match || room_name.contains(&profile.email)
}

/// Whether `room` is the scoped room belonging to `user` with the given
/// profile.
fn owns_scoped_room(room: &Room, user: UserId, profile: &Profile) -> bool {
    match room.owner {
        Some(owner) => owner == user,
        None => room_matches_profile(&room.name, profile),
    }
}

/// The profile in `directory` correlated to a scoped room, if any.
fn correlated_profile<'a>(room: &Room, directory: &'a [Profile]) -> Option<&'a Profile> {
    if let Some(owner) = room.owner {
        return directory.iter().find(|p| p.user_id == owner);
    }
    directory.iter().find(|p| room_matches_profile(&room.name, p))
}

/// Compute the ordered list of rooms visible to `actor`.
///
/// `catalog` is the unfiltered room list; `directory` supplies the
/// profiles used to label scoped rooms for admins. Output is stable,
/// ordered by creation time ascending (ties broken by room id).
///
/// A profile-lookup miss never fails the list: the affected scoped room is
/// labeled with its raw stored name instead.
pub fn visible_rooms(
    actor: &Profile,
    role: Role,
    catalog: &[Room],
    directory: &[Profile],
) -> Vec<RoomView> {
    let mut rooms: Vec<&Room> = catalog
        .iter()
        .filter(|room| match role {
            Role::Admin => room.kind != RoomKind::AllUsers,
            Role::User => match room.kind {
                RoomKind::AdminAllUsers | RoomKind::AllUsers => true,
                RoomKind::UserAdmin => owns_scoped_room(room, actor.user_id, actor),
            },
        })
        .collect();
    rooms.sort_by_key(|room| (room.created_at, room.id));

    rooms
        .into_iter()
        .map(|room| RoomView { room: room.clone(), display_name: display_name(room, role, directory) })
        .collect()
}

/// Resolve the display name for one visible room.
fn display_name(room: &Room, role: Role, directory: &[Profile]) -> String {
    if role == Role::User {
        return room.name.clone();
    }
    match room.kind {
        RoomKind::AdminAllUsers => "Admin & All Users".to_owned(),
        RoomKind::UserAdmin => match correlated_profile(room, directory) {
            Some(profile) => format!("Chat with User: {}", profile.label()),
            None => {
                tracing::debug!(room = %room.name, "no profile correlates to scoped room");
                room.name.clone()
            },
        },
        RoomKind::AllUsers => room.name.clone(),
    }
}
