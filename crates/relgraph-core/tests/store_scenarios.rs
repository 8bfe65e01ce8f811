use relgraph_core::error::ErrorCode;
use relgraph_core::model::status;
use relgraph_core::services::{BugService, HistoryEvent, Notification};
use relgraph_core::{
    BugId, Link, Notify, RelationshipError, RelationshipId, RelationshipType as T, SameTypeCheck,
};

use fixtures::Fixture;

#[test]
fn child_blocking_parent_is_stored_as_parent_depends_on_child() {
    let fx = Fixture::new();
    let child = fx.bug_with_id(5, 1, "Login fails");
    let parent = fx.bug_with_id(10, 1, "Release 2.0");
    let store = fx.store();

    let id = store.add(child, parent, T::Blocks, Notify::Both).expect("add");

    let row = store.get(id).expect("get");
    assert_eq!(row.link(), Link::new(parent, child, T::DependsOn));

    let child_history = fx.history(child);
    assert_eq!(child_history.len(), 1);
    assert_eq!(child_history[0].event, HistoryEvent::RelationshipAdded);
    assert_eq!(child_history[0].kind, T::Blocks);
    assert_eq!(child_history[0].other, parent);

    let parent_history = fx.history(parent);
    assert_eq!(parent_history.len(), 1);
    assert_eq!(parent_history[0].kind, T::DependsOn);
    assert_eq!(parent_history[0].other, child);

    assert_eq!(
        fx.notifier.take(),
        vec![Notification::Added {
            source: child,
            destination: parent,
            kind: T::Blocks,
            notify_source: true,
        }]
    );
}

#[test]
fn both_directions_store_the_same_row() {
    let fx = Fixture::new();
    let store = fx.store();

    let a = store
        .add(BugId(5), BugId(10), T::Blocks, Notify::Both)
        .expect("add");
    let b = store
        .add(BugId(10), BugId(5), T::DependsOn, Notify::Both)
        .expect("add");

    assert_eq!(
        store.get(a).expect("get").link(),
        store.get(b).expect("get").link()
    );
}

#[test]
fn parent_cannot_resolve_until_child_is_resolved() {
    let fx = Fixture::new();
    let child = fx.bug_with_id(5, 1, "Login fails");
    let parent = fx.bug_with_id(10, 1, "Release 2.0");
    let store = fx.store();
    store
        .add(parent, child, T::DependsOn, Notify::Both)
        .expect("add");

    assert!(!store.can_resolve(parent).expect("can resolve"));
    assert!(store.can_resolve(child).expect("can resolve"));

    fx.set_status(child, status::RESOLVED);
    assert!(store.can_resolve(parent).expect("can resolve"));

    fx.set_status(child, status::CLOSED);
    assert!(store.can_resolve(parent).expect("can resolve"));
}

#[test]
fn missing_children_and_other_types_do_not_block() {
    let fx = Fixture::new();
    let parent = fx.bug("parent");
    let related = fx.bug("related");
    let store = fx.store();
    store
        .add(parent, BugId(404), T::DependsOn, Notify::Both)
        .expect("add");
    store
        .add(parent, related, T::RelatedTo, Notify::Both)
        .expect("add");
    store
        .add(parent, related, T::DuplicateOf, Notify::Both)
        .expect("add");

    assert!(store.can_resolve(parent).expect("can resolve"));
}

#[test]
fn linked_bug_id_returns_the_other_endpoint() {
    let fx = Fixture::new();
    let store = fx.store();
    let id = store
        .add(BugId(5), BugId(10), T::Blocks, Notify::Both)
        .expect("add");

    assert_eq!(store.linked_bug_id(id, BugId(5)).expect("linked"), BugId(10));
    assert_eq!(store.linked_bug_id(id, BugId(10)).expect("linked"), BugId(5));

    let err = store.linked_bug_id(id, BugId(999)).expect_err("not an endpoint");
    assert_eq!(err.code(), ErrorCode::RelationshipNotFound);

    let err = store
        .linked_bug_id(RelationshipId(4242), BugId(5))
        .expect_err("missing relationship");
    assert!(matches!(err, RelationshipError::NotFound(RelationshipId(4242))));
}

#[test]
fn exists_is_symmetric() {
    let fx = Fixture::new();
    let store = fx.store();
    let id = store
        .add(BugId(1), BugId(2), T::RelatedTo, Notify::Both)
        .expect("add");

    assert_eq!(store.exists(BugId(1), BugId(2)).expect("exists"), Some(id));
    assert_eq!(store.exists(BugId(2), BugId(1)).expect("exists"), Some(id));
    assert_eq!(store.exists(BugId(1), BugId(3)).expect("exists"), None);
}

#[test]
fn same_type_exists_compares_effective_type() {
    let fx = Fixture::new();
    let store = fx.store();
    let id = store
        .add(BugId(10), BugId(5), T::DependsOn, Notify::Both)
        .expect("add");

    let check = |src: i64, dest: i64, kind: T| {
        store
            .same_type_exists(BugId(src), BugId(dest), kind)
            .expect("check")
    };
    assert_eq!(check(10, 5, T::DependsOn), SameTypeCheck::SameType(id));
    assert_eq!(check(5, 10, T::Blocks), SameTypeCheck::SameType(id));
    assert_eq!(check(5, 10, T::DependsOn), SameTypeCheck::DifferentType(id));
    assert_eq!(check(10, 5, T::RelatedTo), SameTypeCheck::DifferentType(id));
    assert_eq!(check(10, 7, T::DependsOn), SameTypeCheck::NoRelationship);
}

#[test]
fn upsert_adds_keeps_then_replaces() {
    let fx = Fixture::new();
    let a = fx.bug("a");
    let b = fx.bug("b");
    let store = fx.store();

    let first = store.upsert(a, b, T::RelatedTo, Notify::Both).expect("upsert");
    let again = store.upsert(a, b, T::RelatedTo, Notify::Both).expect("upsert");
    assert_eq!(first, again);
    assert_eq!(fx.relationship_rows(), 1);
    assert_eq!(fx.notifier.take().len(), 1);

    let replaced = store.upsert(b, a, T::Blocks, Notify::Both).expect("upsert");
    assert_eq!(replaced, first);
    assert_eq!(fx.relationship_rows(), 1);
    assert_eq!(
        store.get(first).expect("get").link(),
        Link::new(a, b, T::DependsOn)
    );

    let events: Vec<_> = fx.history(a).iter().map(|entry| entry.event).collect();
    assert_eq!(
        events,
        vec![
            HistoryEvent::RelationshipAdded,
            HistoryEvent::RelationshipReplaced
        ]
    );
    assert!(matches!(
        fx.notifier.take().as_slice(),
        [Notification::Added { kind: T::Blocks, .. }]
    ));
}

#[test]
fn update_of_missing_relationship_fails() {
    let fx = Fixture::new();
    let store = fx.store();
    let err = store
        .update(RelationshipId(9), BugId(1), BugId(2), T::RelatedTo, Notify::Both)
        .expect_err("missing");
    assert!(matches!(err, RelationshipError::NotFound(RelationshipId(9))));
    assert_eq!(fx.history(BugId(1)).len(), 0);
}

#[test]
fn invalid_links_are_rejected_before_writing() {
    let fx = Fixture::new();
    let store = fx.store();

    let err = store
        .add(BugId(3), BugId(3), T::RelatedTo, Notify::Both)
        .expect_err("self link");
    assert_eq!(err.code(), ErrorCode::SelfReference);

    let err = store
        .add(BugId(3), BugId(4), T::Custom(77), Notify::Both)
        .expect_err("unknown type");
    assert!(matches!(err, RelationshipError::UnknownType(77)));

    assert_eq!(fx.relationship_rows(), 0);
    assert!(fx.notifier.is_empty());
}

#[test]
fn delete_logs_both_sides_and_notifies_on_request() {
    let fx = Fixture::new();
    let parent = fx.bug("parent");
    let child = fx.bug("child");
    let store = fx.store();
    let id = store
        .add(parent, child, T::DependsOn, Notify::Both)
        .expect("add");
    fx.notifier.take();

    store.delete(id, true).expect("delete");
    assert!(matches!(
        store.get(id),
        Err(RelationshipError::NotFound(_))
    ));

    let parent_last = fx.history(parent).pop().expect("history");
    assert_eq!(parent_last.event, HistoryEvent::RelationshipDeleted);
    assert_eq!(parent_last.kind, T::DependsOn);
    let child_last = fx.history(child).pop().expect("history");
    assert_eq!(child_last.event, HistoryEvent::RelationshipDeleted);
    assert_eq!(child_last.kind, T::Blocks);

    assert_eq!(
        fx.notifier.take(),
        vec![Notification::Deleted {
            source: parent,
            destination: child,
            kind: T::DependsOn,
        }]
    );

    let quiet = store
        .add(parent, child, T::RelatedTo, Notify::Both)
        .expect("add");
    fx.notifier.take();
    store.delete(quiet, false).expect("delete");
    assert!(fx.notifier.is_empty());

    assert!(matches!(
        store.delete(quiet, false),
        Err(RelationshipError::NotFound(_))
    ));
}

#[test]
fn delete_tolerates_missing_destination_bug() {
    let fx = Fixture::new();
    let parent = fx.bug("parent");
    let child = fx.bug("child");
    let store = fx.store();
    let id = store
        .add(parent, child, T::DependsOn, Notify::Both)
        .expect("add");
    assert!(fx.bugs().remove(child).expect("remove"));
    let before = fx.history(child).len();

    store.delete(id, false).expect("delete");

    assert_eq!(fx.history(child).len(), before);
    assert_eq!(
        fx.history(parent).pop().map(|entry| entry.event),
        Some(HistoryEvent::RelationshipDeleted)
    );
}

#[test]
fn delete_all_detaches_the_bug_everywhere() {
    let fx = Fixture::new();
    let doomed = fx.bug("doomed");
    let a = fx.bug("a");
    let b = fx.bug("b");
    let store = fx.store();
    store.add(doomed, a, T::DependsOn, Notify::Both).expect("add");
    store.add(b, doomed, T::DuplicateOf, Notify::Both).expect("add");
    store.add(a, doomed, T::Blocks, Notify::Both).expect("add");
    store.add(a, b, T::RelatedTo, Notify::Both).expect("add");
    fx.notifier.take();

    assert_eq!(store.delete_all(doomed).expect("delete all"), 3);

    assert!(store.all(doomed).expect("all").is_empty());
    for other in [a, b] {
        let related = store.all(other).expect("all");
        assert!(
            related
                .relationships
                .iter()
                .all(|rel| !rel.link().touches(doomed))
        );
    }
    assert_eq!(fx.relationship_rows(), 1);
    assert!(fx.notifier.is_empty());
}

#[test]
fn copy_all_reproduces_relationships_from_the_copy_side() {
    let fx = Fixture::new();
    let original = fx.bug("original");
    let clone = fx.bug("clone");
    let child = fx.bug("child");
    let dup = fx.bug("dup");
    let store = fx.store();
    store
        .add(original, child, T::DependsOn, Notify::Both)
        .expect("add");
    store
        .add(dup, original, T::DuplicateOf, Notify::Both)
        .expect("add");
    store
        .add(original, clone, T::RelatedTo, Notify::Both)
        .expect("add");
    fx.notifier.take();

    let created = store.copy_all(original, clone).expect("copy");
    assert_eq!(created.len(), 2);

    let links: Vec<Link> = created
        .iter()
        .map(|id| store.get(*id).expect("get").link())
        .collect();
    assert!(links.contains(&Link::new(clone, child, T::DependsOn)));
    assert!(links.contains(&Link::new(dup, clone, T::DuplicateOf)));

    let sent = fx.notifier.take();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|n| matches!(
        n,
        Notification::Added {
            source,
            notify_source: false,
            ..
        } if *source == clone
    )));
}

#[test]
fn all_reports_cross_project_links_and_keeps_order() {
    let fx = Fixture::new();
    let bug = fx.bug_with_id(1, 1, "bug");
    let same = fx.bug_with_id(2, 1, "same project");
    let other = fx.bug_with_id(3, 2, "other project");
    let store = fx.store();

    store.add(bug, same, T::DependsOn, Notify::Both).expect("add");
    store.add(bug, same, T::RelatedTo, Notify::Both).expect("add");
    let no_cross = store.all(bug).expect("all");
    assert!(!no_cross.crosses_projects);
    let kinds: Vec<T> = no_cross.relationships.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![T::RelatedTo, T::DependsOn]);

    store.add(other, bug, T::RelatedTo, Notify::Both).expect("add");
    let crossing = store.all(bug).expect("all");
    assert!(crossing.crosses_projects);
    assert_eq!(crossing.len(), 3);
    let last = crossing.relationships.last().expect("incoming row");
    assert_eq!(last.source, other);
    assert_eq!(last.source_project.map(|p| p.0), Some(2));
    assert_eq!(last.destination_project.map(|p| p.0), Some(1));
}

#[test]
fn dangling_endpoints_have_no_project() {
    let fx = Fixture::new();
    let bug = fx.bug("bug");
    let store = fx.store();
    store
        .add(bug, BugId(404), T::RelatedTo, Notify::Both)
        .expect("add");

    let rows = store.all_from_source(bug).expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].destination_project, None);
    assert!(!store.all(bug).expect("all").crosses_projects);
    assert!(!store.bugs().exists(BugId(404)).expect("exists"));
}
