//! Role-filtered alert routing for inserted notifications.
//!
//! The portal surfaces a toast/desktop alert when a notification row is
//! inserted while a client is online. Users are alerted only for rows
//! they own; admins are alerted for everything. Emergencies are urgent
//! and should be rendered as requiring interaction.

use crate::model::{Notification, NotificationKind, Role, UserId};

/// An advisory alert derived from a freshly inserted notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Headline, e.g. "New Assignment".
    pub title: String,
    /// Detail line shown under the headline.
    pub body: String,
    /// Whether the alert should demand interaction.
    pub urgent: bool,
}

/// Whether this actor should be alerted for `row`.
pub fn should_alert(role: Role, self_id: UserId, row: &Notification) -> bool {
    role == Role::Admin || row.user_id == self_id
}

/// Build the alert payload for `row`.
pub fn alert_for(row: &Notification) -> Alert {
    let title = match row.kind {
        NotificationKind::Assignment => "New Assignment",
        NotificationKind::Complaint => "New Complaint",
        NotificationKind::Emergency => "Emergency Alert",
        NotificationKind::Grade => "Submission Graded",
        NotificationKind::Application => "Course Application",
    };

    Alert {
        title: title.to_owned(),
        body: if row.message.is_empty() { row.title.clone() } else { row.message.clone() },
        urgent: row.kind == NotificationKind::Emergency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(user_id: UserId, kind: NotificationKind) -> Notification {
        Notification {
            id: 1,
            user_id,
            kind,
            title: "Week 3 essay".into(),
            message: String::new(),
            link: None,
            read: false,
            created_at: 0,
        }
    }

    #[test]
    fn users_are_alerted_only_for_their_own_rows() {
        let row = notification(1, NotificationKind::Assignment);
        assert!(should_alert(Role::User, 1, &row));
        assert!(!should_alert(Role::User, 2, &row));
    }

    #[test]
    fn admins_are_alerted_for_everything() {
        let row = notification(1, NotificationKind::Complaint);
        assert!(should_alert(Role::Admin, 99, &row));
    }

    #[test]
    fn emergencies_are_urgent() {
        assert!(alert_for(&notification(1, NotificationKind::Emergency)).urgent);
        assert!(!alert_for(&notification(1, NotificationKind::Grade)).urgent);
    }

    #[test]
    fn body_falls_back_to_the_row_title() {
        let alert = alert_for(&notification(1, NotificationKind::Assignment));
        assert_eq!(alert.title, "New Assignment");
        assert_eq!(alert.body, "Week 3 essay");
    }
}
