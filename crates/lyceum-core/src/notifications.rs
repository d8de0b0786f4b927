//! Notification ledger and unread badge counts.
//!
//! Badge counts are always recomputed from the full unread set, never
//! adjusted incrementally: whenever any notification changes, the caller
//! refetches the actor's rows and replaces the ledger wholesale. Eventual
//! consistency is acceptable here; lost fine-grained updates are not.

use crate::model::{Notification, NotificationKind, UserId};

/// Unread notification counts per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnreadCounts {
    /// Unread assignment notifications.
    pub assignment: usize,
    /// Unread complaint notifications.
    pub complaint: usize,
    /// Unread emergency notifications.
    pub emergency: usize,
    /// Unread grade notifications.
    pub grade: usize,
    /// Unread application notifications.
    pub application: usize,
}

impl UnreadCounts {
    /// Count for one category.
    pub fn get(&self, kind: NotificationKind) -> usize {
        match kind {
            NotificationKind::Assignment => self.assignment,
            NotificationKind::Complaint => self.complaint,
            NotificationKind::Emergency => self.emergency,
            NotificationKind::Grade => self.grade,
            NotificationKind::Application => self.application,
        }
    }

    /// Total across all categories.
    pub fn total(&self) -> usize {
        NotificationKind::ALL.iter().map(|&kind| self.get(kind)).sum()
    }

    fn bump(&mut self, kind: NotificationKind) {
        match kind {
            NotificationKind::Assignment => self.assignment += 1,
            NotificationKind::Complaint => self.complaint += 1,
            NotificationKind::Emergency => self.emergency += 1,
            NotificationKind::Grade => self.grade += 1,
            NotificationKind::Application => self.application += 1,
        }
    }
}

/// The actor's notification rows plus derived badge counts.
#[derive(Debug, Clone)]
pub struct NotificationLedger {
    user: UserId,
    rows: Vec<Notification>,
}

impl NotificationLedger {
    /// Create an empty ledger for `user`.
    pub fn new(user: UserId) -> Self {
        Self { user, rows: Vec::new() }
    }

    /// The owning identity this ledger tracks.
    pub fn user(&self) -> UserId {
        self.user
    }

    /// Replace the ledger with a fresh fetch. Rows owned by other users
    /// are discarded defensively; the backend query is already scoped.
    pub fn replace(&mut self, rows: Vec<Notification>) {
        self.rows = rows.into_iter().filter(|row| row.user_id == self.user).collect();
    }

    /// All rows, newest first.
    pub fn rows(&self) -> &[Notification] {
        &self.rows
    }

    /// Badge counts recomputed from the full unread set.
    pub fn counts(&self) -> UnreadCounts {
        let mut counts = UnreadCounts::default();
        for row in self.rows.iter().filter(|row| !row.read) {
            counts.bump(row.kind);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(id: u128, user_id: UserId, kind: NotificationKind, read: bool) -> Notification {
        Notification {
            id,
            user_id,
            kind,
            title: "t".into(),
            message: "m".into(),
            link: None,
            read,
            created_at: id as u64,
        }
    }

    #[test]
    fn counts_cover_only_unread_rows() {
        let mut ledger = NotificationLedger::new(1);
        ledger.replace(vec![
            notification(1, 1, NotificationKind::Assignment, false),
            notification(2, 1, NotificationKind::Assignment, true),
            notification(3, 1, NotificationKind::Emergency, false),
        ]);

        let counts = ledger.counts();
        assert_eq!(counts.get(NotificationKind::Assignment), 1);
        assert_eq!(counts.get(NotificationKind::Emergency), 1);
        assert_eq!(counts.get(NotificationKind::Grade), 0);
        assert_eq!(counts.total(), 2);
    }

    #[test]
    fn replace_recounts_after_mark_read() {
        let mut ledger = NotificationLedger::new(1);
        ledger.replace(vec![notification(1, 1, NotificationKind::Complaint, false)]);
        assert_eq!(ledger.counts().complaint, 1);

        // The refetch after a bulk mark-read comes back all-read.
        ledger.replace(vec![notification(1, 1, NotificationKind::Complaint, true)]);
        assert_eq!(ledger.counts().complaint, 0);
        assert_eq!(ledger.counts().total(), 0);
    }

    #[test]
    fn foreign_rows_are_discarded() {
        let mut ledger = NotificationLedger::new(1);
        ledger.replace(vec![
            notification(1, 1, NotificationKind::Grade, false),
            notification(2, 2, NotificationKind::Grade, false),
        ]);

        assert_eq!(ledger.rows().len(), 1);
        assert_eq!(ledger.counts().grade, 1);
    }
}
