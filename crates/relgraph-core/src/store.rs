//! The relationship store: linking, unlinking and querying relationships
//! between bugs.
//!
//! Every mutating operation takes the link in the caller's direction,
//! normalizes it with [`Link::canonical`] and writes the canonical row.
//! History entries and notifications are still expressed in the caller's
//! direction, so each bug's audit trail reads naturally from its own side.
//!
//! # Preconditions
//!
//! The store performs no permission checks. Callers must verify that the
//! acting user may update the source bug and view the destination bug
//! before invoking [`RelationshipStore::add`], [`RelationshipStore::update`],
//! [`RelationshipStore::upsert`] or [`RelationshipStore::delete`].
//!
//! # Concurrency
//!
//! Multi-step operations (`upsert`, `copy_all`, `delete_all`) are not
//! transactional. Concurrent edits of the same pair are last-writer-wins.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::{RelationshipError, Result};
use crate::link::Link;
use crate::model::{BugId, BugRelationship, RelatedSet, Relationship, RelationshipId, SameTypeCheck};
use crate::registry::{RelationshipType, TypeRegistry};
use crate::services::{BugService, HistoryEvent, HistoryLog, Notifier, RelationshipRepository};

/// Status threshold used by [`RelationshipStore::can_resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvePolicy {
    /// Bugs with a status at or above this value count as resolved.
    pub resolved_status: u16,
}

impl Default for ResolvePolicy {
    fn default() -> Self {
        Self {
            resolved_status: crate::model::status::RESOLVED,
        }
    }
}

/// Who hears about a new relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Notify {
    /// Watchers of both bugs.
    #[default]
    Both,
    /// Only the destination's watchers. Used when relationships are copied
    /// onto a freshly cloned source bug.
    DestinationOnly,
}

impl Notify {
    const fn includes_source(self) -> bool {
        matches!(self, Self::Both)
    }
}

/// The collaborators a store is wired to.
pub struct Services<'a> {
    pub relationships: Box<dyn RelationshipRepository + 'a>,
    pub bugs: Box<dyn BugService + 'a>,
    pub history: Box<dyn HistoryLog + 'a>,
    pub notifier: Box<dyn Notifier + 'a>,
}

/// Relationship CRUD and queries over one repository.
pub struct RelationshipStore<'a> {
    registry: &'a TypeRegistry,
    policy: ResolvePolicy,
    relationships: Box<dyn RelationshipRepository + 'a>,
    bugs: Box<dyn BugService + 'a>,
    history: Box<dyn HistoryLog + 'a>,
    notifier: Box<dyn Notifier + 'a>,
}

impl<'a> RelationshipStore<'a> {
    #[must_use]
    pub fn new(registry: &'a TypeRegistry, policy: ResolvePolicy, services: Services<'a>) -> Self {
        Self {
            registry,
            policy,
            relationships: services.relationships,
            bugs: services.bugs,
            history: services.history,
            notifier: services.notifier,
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    #[must_use]
    pub const fn policy(&self) -> ResolvePolicy {
        self.policy
    }

    /// The bug service this store reads endpoints through.
    #[must_use]
    pub fn bugs(&self) -> &dyn BugService {
        self.bugs.as_ref()
    }

    /// Create a relationship. No duplicate check is made; use
    /// [`upsert`](Self::upsert) or [`same_type_exists`](Self::same_type_exists)
    /// when that matters.
    ///
    /// # Errors
    ///
    /// `SelfReference` when both ends are the same bug, `UnknownType` for
    /// unregistered types, and collaborator failures.
    pub fn add(
        &self,
        source: BugId,
        destination: BugId,
        kind: RelationshipType,
        notify: Notify,
    ) -> Result<RelationshipId> {
        let requested = self.validate(source, destination, kind)?;
        let stored = requested.canonical(self.registry)?;
        let id = self.relationships.insert(&stored)?;
        info!(
            relationship_id = %id,
            %source,
            %destination,
            kind = %kind,
            "relationship added"
        );

        self.log_both(&requested, HistoryEvent::RelationshipAdded)?;
        self.bugs.touch(source)?;
        self.bugs.touch(destination)?;
        self.notifier
            .relationship_added(source, destination, kind, notify.includes_source())?;

        Ok(id)
    }

    /// Re-point and re-type an existing relationship in place. Sends the
    /// "added" notification again; there is no distinct "changed" kind.
    ///
    /// # Errors
    ///
    /// `NotFound` when `id` does not exist, plus the errors of
    /// [`add`](Self::add).
    pub fn update(
        &self,
        id: RelationshipId,
        source: BugId,
        destination: BugId,
        kind: RelationshipType,
        notify: Notify,
    ) -> Result<()> {
        let requested = self.validate(source, destination, kind)?;
        let stored = requested.canonical(self.registry)?;
        let previous = self.get(id)?;
        self.relationships.update(id, &stored)?;
        info!(
            relationship_id = %id,
            %source,
            %destination,
            kind = %kind,
            previous_kind = %previous.kind,
            "relationship replaced"
        );

        self.log_both(&requested, HistoryEvent::RelationshipReplaced)?;
        self.bugs.touch(source)?;
        self.bugs.touch(destination)?;
        self.notifier
            .relationship_added(source, destination, kind, notify.includes_source())?;

        Ok(())
    }

    /// Add, replace or keep the relationship between two bugs so exactly
    /// one row connects them with the requested type.
    ///
    /// # Errors
    ///
    /// Errors of [`add`](Self::add) and [`update`](Self::update).
    pub fn upsert(
        &self,
        source: BugId,
        destination: BugId,
        kind: RelationshipType,
        notify: Notify,
    ) -> Result<RelationshipId> {
        match self.same_type_exists(source, destination, kind)? {
            SameTypeCheck::NoRelationship => self.add(source, destination, kind, notify),
            SameTypeCheck::DifferentType(id) => {
                self.update(id, source, destination, kind, notify)?;
                Ok(id)
            }
            SameTypeCheck::SameType(id) => {
                debug!(relationship_id = %id, "relationship already present; upsert is a no-op");
                Ok(id)
            }
        }
    }

    /// Remove a relationship. History on the destination is skipped when
    /// that bug no longer exists.
    ///
    /// # Errors
    ///
    /// `NotFound` when `id` does not exist, and collaborator failures.
    pub fn delete(&self, id: RelationshipId, send_email: bool) -> Result<()> {
        let row = self.get(id)?;
        self.relationships.delete(id)?;
        info!(
            relationship_id = %id,
            source = %row.source,
            destination = %row.destination,
            kind = %row.kind,
            "relationship deleted"
        );

        self.bugs.touch(row.source)?;
        self.bugs.touch(row.destination)?;

        self.history.log_event(
            row.source,
            HistoryEvent::RelationshipDeleted,
            row.kind,
            row.destination,
        )?;
        if self.bugs.exists(row.destination)? {
            self.history.log_event(
                row.destination,
                HistoryEvent::RelationshipDeleted,
                self.registry.complementary(row.kind)?,
                row.source,
            )?;
        } else {
            debug!(
                relationship_id = %id,
                destination = %row.destination,
                "destination bug is gone; skipping its history entry"
            );
        }

        if send_email {
            self.notifier
                .relationship_deleted(row.source, row.destination, row.kind)?;
        }
        Ok(())
    }

    /// Remove every relationship touching `bug`, without notifications.
    /// Used when the bug itself is being deleted.
    ///
    /// # Errors
    ///
    /// Collaborator failures.
    pub fn delete_all(&self, bug: BugId) -> Result<usize> {
        let mut ids: BTreeSet<RelationshipId> = BTreeSet::new();
        ids.extend(self.relationships.by_source(bug)?.iter().map(|row| row.id));
        ids.extend(self.relationships.by_destination(bug)?.iter().map(|row| row.id));

        for id in &ids {
            self.delete(*id, false)?;
        }
        info!(%bug, removed = ids.len(), "deleted all relationships of bug");
        Ok(ids.len())
    }

    /// Attach copies of every relationship of `from` to `to`, keeping each
    /// relationship's meaning from the copied bug's side. Source-side
    /// notifications are suppressed. Relationships between `from` and `to`
    /// are not copied.
    ///
    /// # Errors
    ///
    /// Errors of [`add`](Self::add).
    pub fn copy_all(&self, from: BugId, to: BugId) -> Result<Vec<RelationshipId>> {
        let mut created = Vec::new();

        for row in self.relationships.by_source(from)? {
            if row.destination == to {
                continue;
            }
            created.push(self.add(to, row.destination, row.kind, Notify::DestinationOnly)?);
        }

        for row in self.relationships.by_destination(from)? {
            if row.source == to {
                continue;
            }
            let kind = self.registry.complementary(row.kind)?;
            created.push(self.add(to, row.source, kind, Notify::DestinationOnly)?);
        }

        info!(%from, %to, copied = created.len(), "copied relationships");
        Ok(created)
    }

    /// Fetch one relationship.
    ///
    /// # Errors
    ///
    /// `NotFound` when `id` does not exist.
    pub fn get(&self, id: RelationshipId) -> Result<Relationship> {
        self.relationships
            .get(id)?
            .ok_or(RelationshipError::NotFound(id))
    }

    /// Id of any relationship connecting the two bugs, in either direction.
    ///
    /// # Errors
    ///
    /// Collaborator failures.
    pub fn exists(&self, a: BugId, b: BugId) -> Result<Option<RelationshipId>> {
        Ok(self.relationships.find_between(a, b)?.map(|row| row.id))
    }

    /// Compare the relationship between two bugs, if any, with the
    /// requested `(source, destination, kind)`.
    ///
    /// # Errors
    ///
    /// `UnknownType` for unregistered types, and collaborator failures.
    pub fn same_type_exists(
        &self,
        source: BugId,
        destination: BugId,
        kind: RelationshipType,
    ) -> Result<SameTypeCheck> {
        let Some(row) = self.relationships.find_between(source, destination)? else {
            return Ok(SameTypeCheck::NoRelationship);
        };

        let effective = if row.source == source && row.destination == destination {
            kind
        } else {
            self.registry.complementary(kind)?
        };

        Ok(if row.kind == effective {
            SameTypeCheck::SameType(row.id)
        } else {
            SameTypeCheck::DifferentType(row.id)
        })
    }

    /// Relationships with `bug` as stored source, ordered by type then id.
    ///
    /// # Errors
    ///
    /// Collaborator failures.
    pub fn all_from_source(&self, bug: BugId) -> Result<Vec<BugRelationship>> {
        let rows = self.relationships.by_source(bug)?;
        self.enrich(bug, rows)
    }

    /// Relationships with `bug` as stored destination, ordered by type then id.
    ///
    /// # Errors
    ///
    /// Collaborator failures.
    pub fn all_to_destination(&self, bug: BugId) -> Result<Vec<BugRelationship>> {
        let rows = self.relationships.by_destination(bug)?;
        self.enrich(bug, rows)
    }

    /// Every relationship touching `bug`, and whether any of them crosses a
    /// project boundary.
    ///
    /// # Errors
    ///
    /// Collaborator failures.
    pub fn all(&self, bug: BugId) -> Result<RelatedSet> {
        let mut relationships = self.all_from_source(bug)?;
        relationships.extend(self.all_to_destination(bug)?);
        let crosses_projects = relationships.iter().any(BugRelationship::crosses_projects);
        Ok(RelatedSet {
            relationships,
            crosses_projects,
        })
    }

    /// The endpoint of relationship `id` that is not `bug`.
    ///
    /// # Errors
    ///
    /// `NotFound` when `id` does not exist, `NotAnEndpoint` when `bug` is on
    /// neither side.
    pub fn linked_bug_id(&self, id: RelationshipId, bug: BugId) -> Result<BugId> {
        self.get(id)?
            .link()
            .other_end(bug)
            .ok_or(RelationshipError::NotAnEndpoint {
                relationship: id,
                bug,
            })
    }

    /// Whether `bug` can be resolved: false while any bug it depends on is
    /// below the resolved threshold. Advisory only; callers may force the
    /// resolution anyway.
    ///
    /// # Errors
    ///
    /// Collaborator failures.
    pub fn can_resolve(&self, bug: BugId) -> Result<bool> {
        let children: Vec<BugId> = self
            .relationships
            .by_source(bug)?
            .into_iter()
            .filter(|row| row.kind == RelationshipType::DependsOn)
            .map(|row| row.destination)
            .collect();
        if children.is_empty() {
            return Ok(true);
        }

        let records = self.bugs.load_many(&children)?;
        let blocker = children.iter().find(|child| {
            records
                .get(child)
                .is_some_and(|record| record.status < self.policy.resolved_status)
        });

        if let Some(blocker) = blocker {
            debug!(%bug, %blocker, "unresolved child blocks resolution");
            return Ok(false);
        }
        Ok(true)
    }

    fn validate(&self, source: BugId, destination: BugId, kind: RelationshipType) -> Result<Link> {
        let link = Link::new(source, destination, kind);
        if link.is_self_link() {
            return Err(RelationshipError::SelfReference(source));
        }
        if !self.registry.contains(kind) {
            return Err(RelationshipError::UnknownType(kind.code()));
        }
        Ok(link)
    }

    fn log_both(&self, requested: &Link, event: HistoryEvent) -> Result<()> {
        self.history
            .log_event(requested.source, event, requested.kind, requested.destination)?;
        self.history.log_event(
            requested.destination,
            event,
            self.registry.complementary(requested.kind)?,
            requested.source,
        )
    }

    fn enrich(&self, bug: BugId, rows: Vec<Relationship>) -> Result<Vec<BugRelationship>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<BugId> = rows
            .iter()
            .flat_map(|row| [row.source, row.destination])
            .collect();
        ids.sort_unstable();
        ids.dedup();
        let records = self.bugs.load_many(&ids)?;
        debug!(%bug, rows = rows.len(), prefetched = records.len(), "enriched relationships");

        let project_of = |id: BugId| records.get(&id).map(|record| record.project_id);
        Ok(rows
            .into_iter()
            .map(|row| BugRelationship {
                id: row.id,
                source: row.source,
                source_project: project_of(row.source),
                destination: row.destination,
                destination_project: project_of(row.destination),
                kind: row.kind,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, NewBug, SqliteBugs};
    use crate::model::{ProjectId, status};
    use crate::services::RecordingNotifier;

    struct DownNotifier;

    impl Notifier for DownNotifier {
        fn relationship_added(
            &self,
            _source: BugId,
            _destination: BugId,
            _kind: RelationshipType,
            _notify_source: bool,
        ) -> Result<()> {
            Err(anyhow::anyhow!("mail relay unreachable").into())
        }

        fn relationship_deleted(
            &self,
            _source: BugId,
            _destination: BugId,
            _kind: RelationshipType,
        ) -> Result<()> {
            Err(anyhow::anyhow!("mail relay unreachable").into())
        }
    }

    fn bug(conn: &rusqlite::Connection, state: u16) -> BugId {
        SqliteBugs::new(conn)
            .create(&NewBug::new(ProjectId(1), "bug").with_status(state))
            .expect("create bug")
    }

    #[test]
    fn notify_destination_only_skips_source() {
        assert!(Notify::Both.includes_source());
        assert!(!Notify::DestinationOnly.includes_source());
    }

    #[test]
    fn notifier_failure_surfaces_after_the_row_is_written() {
        let conn = db::open_in_memory().expect("db");
        let registry = TypeRegistry::builtin();
        let a = bug(&conn, status::NEW);
        let b = bug(&conn, status::NEW);
        let store = db::store(
            &conn,
            &registry,
            ResolvePolicy::default(),
            status::RESOLVED,
            DownNotifier,
        );

        let err = store
            .add(a, b, RelationshipType::RelatedTo, Notify::Both)
            .expect_err("notifier is down");
        assert!(matches!(err, RelationshipError::Collaborator(_)));
        assert_eq!(err.to_string(), "mail relay unreachable");
        assert!(store.exists(a, b).expect("exists").is_some());
    }

    #[test]
    fn resolve_policy_threshold_is_respected() {
        let conn = db::open_in_memory().expect("db");
        let registry = TypeRegistry::builtin();
        let notifier = RecordingNotifier::new();
        let parent = bug(&conn, status::NEW);
        let child = bug(&conn, status::RESOLVED);
        let strict = db::store(
            &conn,
            &registry,
            ResolvePolicy {
                resolved_status: status::CLOSED,
            },
            status::CLOSED,
            &notifier,
        );

        strict
            .add(parent, child, RelationshipType::DependsOn, Notify::Both)
            .expect("add");
        assert!(!strict.can_resolve(parent).expect("can resolve"));
        assert_eq!(strict.policy().resolved_status, status::CLOSED);

        let lenient = db::store(
            &conn,
            &registry,
            ResolvePolicy::default(),
            status::RESOLVED,
            &notifier,
        );
        assert!(lenient.can_resolve(parent).expect("can resolve"));
    }

    #[test]
    fn rejected_links_write_nothing() {
        let conn = db::open_in_memory().expect("db");
        let registry = TypeRegistry::builtin();
        let notifier = RecordingNotifier::new();
        let a = bug(&conn, status::NEW);
        let store = db::store(
            &conn,
            &registry,
            ResolvePolicy::default(),
            status::RESOLVED,
            &notifier,
        );

        assert!(matches!(
            store.add(a, a, RelationshipType::RelatedTo, Notify::Both),
            Err(RelationshipError::SelfReference(bug)) if bug == a
        ));
        assert!(matches!(
            store.add(a, BugId(99), RelationshipType::Custom(42), Notify::Both),
            Err(RelationshipError::UnknownType(42))
        ));
        assert!(notifier.is_empty());
        assert!(store.all(a).expect("all").is_empty());
    }
}
