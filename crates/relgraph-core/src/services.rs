//! Collaborator interfaces consumed by the relationship store.
//!
//! The store never talks to a database, mailer or audit trail directly; it
//! goes through these traits. SQLite implementations live in
//! [`crate::db`]; the notifier and access-control implementations here are
//! the ones the CLI wires up.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::Result;
use crate::link::Link;
use crate::model::{BugId, BugRecord, Relationship, RelationshipId};
use crate::registry::RelationshipType;

/// Storage for `bug_relationship` rows. Links handed to it are already in
/// canonical direction.
pub trait RelationshipRepository {
    /// # Errors
    ///
    /// Storage failures.
    fn insert(&self, link: &Link) -> Result<RelationshipId>;

    /// Rewrite the row in place.
    ///
    /// # Errors
    ///
    /// Storage failures. Updating a missing id is not an error here.
    fn update(&self, id: RelationshipId, link: &Link) -> Result<()>;

    /// # Errors
    ///
    /// Storage failures.
    fn delete(&self, id: RelationshipId) -> Result<()>;

    /// # Errors
    ///
    /// Storage failures.
    fn get(&self, id: RelationshipId) -> Result<Option<Relationship>>;

    /// First row connecting the two bugs in either direction.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn find_between(&self, a: BugId, b: BugId) -> Result<Option<Relationship>>;

    /// Rows with `bug` as source, ordered by `(type code, id)`.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn by_source(&self, bug: BugId) -> Result<Vec<Relationship>>;

    /// Rows with `bug` as destination, ordered by `(type code, id)`.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn by_destination(&self, bug: BugId) -> Result<Vec<Relationship>>;
}

/// Read/touch access to bug records.
pub trait BugService {
    /// # Errors
    ///
    /// Storage failures. A missing bug is `Ok(None)`.
    fn load(&self, bug: BugId) -> Result<Option<BugRecord>>;

    /// Bulk pre-fetch. Missing ids are absent from the map.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn load_many(&self, bugs: &[BugId]) -> Result<HashMap<BugId, BugRecord>>;

    /// Bump the last-modified timestamp. Missing bugs are ignored.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn touch(&self, bug: BugId) -> Result<()>;

    /// # Errors
    ///
    /// Storage failures.
    fn is_read_only(&self, bug: BugId) -> Result<bool>;

    /// # Errors
    ///
    /// Storage failures.
    fn exists(&self, bug: BugId) -> Result<bool> {
        Ok(self.load(bug)?.is_some())
    }
}

/// History entry kinds written for relationship changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryEvent {
    RelationshipAdded,
    RelationshipDeleted,
    RelationshipReplaced,
}

impl HistoryEvent {
    /// Code persisted in the history table.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::RelationshipAdded => 18,
            Self::RelationshipDeleted => 19,
            Self::RelationshipReplaced => 23,
        }
    }

    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            18 => Some(Self::RelationshipAdded),
            19 => Some(Self::RelationshipDeleted),
            23 => Some(Self::RelationshipReplaced),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RelationshipAdded => "relationship_added",
            Self::RelationshipDeleted => "relationship_deleted",
            Self::RelationshipReplaced => "relationship_replaced",
        }
    }
}

/// Audit trail of changes made to a bug.
pub trait HistoryLog {
    /// Record that `bug` gained/lost/changed a relationship of `kind` to
    /// `other`. `kind` is expressed from `bug`'s point of view.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn log_event(
        &self,
        bug: BugId,
        event: HistoryEvent,
        kind: RelationshipType,
        other: BugId,
    ) -> Result<()>;
}

/// Outbound notifications to the watchers of the two bugs.
pub trait Notifier {
    /// `notify_source == false` skips the source bug's watchers.
    ///
    /// # Errors
    ///
    /// Delivery failures.
    fn relationship_added(
        &self,
        source: BugId,
        destination: BugId,
        kind: RelationshipType,
        notify_source: bool,
    ) -> Result<()>;

    /// # Errors
    ///
    /// Delivery failures.
    fn relationship_deleted(
        &self,
        source: BugId,
        destination: BugId,
        kind: RelationshipType,
    ) -> Result<()>;
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn relationship_added(
        &self,
        source: BugId,
        destination: BugId,
        kind: RelationshipType,
        notify_source: bool,
    ) -> Result<()> {
        (**self).relationship_added(source, destination, kind, notify_source)
    }

    fn relationship_deleted(
        &self,
        source: BugId,
        destination: BugId,
        kind: RelationshipType,
    ) -> Result<()> {
        (**self).relationship_deleted(source, destination, kind)
    }
}

/// Permission checks for the current viewer. Only presentation code asks;
/// the store's mutating operations expect callers to have checked already.
pub trait AccessControl {
    /// # Errors
    ///
    /// Lookup failures.
    fn has_permission(&self, threshold: u16, bug: BugId) -> Result<bool>;
}

/// Access control for a viewer with one access level on every bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAccessLevel(pub u16);

impl AccessControl for FixedAccessLevel {
    fn has_permission(&self, threshold: u16, _bug: BugId) -> Result<bool> {
        Ok(self.0 >= threshold)
    }
}

/// Notifier that emits each notification as a structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn relationship_added(
        &self,
        source: BugId,
        destination: BugId,
        kind: RelationshipType,
        notify_source: bool,
    ) -> Result<()> {
        tracing::info!(
            %source,
            %destination,
            kind = %kind,
            notify_source,
            "relationship added notification"
        );
        Ok(())
    }

    fn relationship_deleted(
        &self,
        source: BugId,
        destination: BugId,
        kind: RelationshipType,
    ) -> Result<()> {
        tracing::info!(%source, %destination, kind = %kind, "relationship deleted notification");
        Ok(())
    }
}

/// One notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Added {
        source: BugId,
        destination: BugId,
        kind: RelationshipType,
        notify_source: bool,
    },
    Deleted {
        source: BugId,
        destination: BugId,
        kind: RelationshipType,
    },
}

/// Notifier that keeps every notification in memory. Useful for callers
/// that batch deliveries, and for tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: RefCell<Vec<Notification>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the captured notifications.
    pub fn take(&self) -> Vec<Notification> {
        self.sent.take()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sent.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sent.borrow().is_empty()
    }
}

impl Notifier for RecordingNotifier {
    fn relationship_added(
        &self,
        source: BugId,
        destination: BugId,
        kind: RelationshipType,
        notify_source: bool,
    ) -> Result<()> {
        self.sent.borrow_mut().push(Notification::Added {
            source,
            destination,
            kind,
            notify_source,
        });
        Ok(())
    }

    fn relationship_deleted(
        &self,
        source: BugId,
        destination: BugId,
        kind: RelationshipType,
    ) -> Result<()> {
        self.sent.borrow_mut().push(Notification::Deleted {
            source,
            destination,
            kind,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_codes_round_trip() {
        for event in [
            HistoryEvent::RelationshipAdded,
            HistoryEvent::RelationshipDeleted,
            HistoryEvent::RelationshipReplaced,
        ] {
            assert_eq!(HistoryEvent::from_code(event.code()), Some(event));
        }
        assert_eq!(HistoryEvent::from_code(1), None);
    }

    #[test]
    fn fixed_access_level_compares_thresholds() {
        let developer = FixedAccessLevel(55);
        assert!(developer.has_permission(40, BugId(1)).expect("infallible"));
        assert!(!developer.has_permission(70, BugId(1)).expect("infallible"));
    }

    #[test]
    fn recording_notifier_drains() {
        let notifier = RecordingNotifier::new();
        let by_ref: &dyn Notifier = &&notifier;
        by_ref
            .relationship_deleted(BugId(1), BugId(2), RelationshipType::RelatedTo)
            .expect("infallible");
        assert_eq!(notifier.len(), 1);
        assert_eq!(
            notifier.take(),
            vec![Notification::Deleted {
                source: BugId(1),
                destination: BugId(2),
                kind: RelationshipType::RelatedTo,
            }]
        );
        assert!(notifier.is_empty());
    }
}
