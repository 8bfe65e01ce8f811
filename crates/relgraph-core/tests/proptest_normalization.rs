use proptest::prelude::*;
use relgraph_core::registry::TypeInfo;
use relgraph_core::{BugId, Link, Notify, RelationshipType, SameTypeCheck, TypeRegistry};

use fixtures::Fixture;

fn registry_with_custom_pair() -> TypeRegistry {
    let mut builder = TypeRegistry::builder();
    builder
        .register(
            RelationshipType::Custom(10),
            TypeInfo::new("caused-by", "caused by", RelationshipType::Custom(11), true),
        )
        .expect("register caused-by");
    builder
        .register(
            RelationshipType::Custom(11),
            TypeInfo::new("causes", "causes", RelationshipType::Custom(10), false),
        )
        .expect("register causes");
    builder.build().expect("valid registry")
}

fn arb_kind() -> impl Strategy<Value = RelationshipType> + Clone {
    prop_oneof![
        Just(RelationshipType::DuplicateOf),
        Just(RelationshipType::RelatedTo),
        Just(RelationshipType::DependsOn),
        Just(RelationshipType::Blocks),
        Just(RelationshipType::HasDuplicate),
        Just(RelationshipType::Custom(10)),
        Just(RelationshipType::Custom(11)),
    ]
}

fn arb_pair() -> impl Strategy<Value = (BugId, BugId)> + Clone {
    (1i64..20, 1i64..20)
        .prop_filter("distinct endpoints", |(a, b)| a != b)
        .prop_map(|(a, b)| (BugId(a), BugId(b)))
}

fn arb_links() -> impl Strategy<Value = Vec<(BugId, BugId, RelationshipType)>> {
    prop::collection::vec(
        (arb_pair(), arb_kind()).prop_map(|((a, b), kind)| (a, b, kind)),
        0..12,
    )
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(64))]

    #[test]
    fn complement_is_an_involution(kind in arb_kind()) {
        let registry = registry_with_custom_pair();
        let back = registry
            .complementary(registry.complementary(kind).expect("registered"))
            .expect("registered");
        prop_assert_eq!(back, kind);
    }

    #[test]
    fn canonical_form_is_forward_and_stable(
        (a, b) in arb_pair(),
        kind in arb_kind(),
    ) {
        let registry = registry_with_custom_pair();
        let canonical = Link::new(a, b, kind).canonical(&registry).expect("canonical");
        prop_assert!(registry.is_forward(canonical.kind).expect("registered"));
        prop_assert_eq!(canonical.canonical(&registry).expect("canonical"), canonical);

        let reversed = Link::new(a, b, kind).reversed(&registry).expect("reversed");
        prop_assert_eq!(reversed.canonical(&registry).expect("canonical"), canonical);
    }

    #[test]
    fn both_phrasings_store_the_same_row(
        (a, b) in arb_pair(),
        kind in arb_kind(),
    ) {
        let fx = Fixture::with_registry(registry_with_custom_pair());
        let store = fx.store();
        let complement = fx.registry.complementary(kind).expect("registered");
        // Self-complementary types keep the caller's direction.
        prop_assume!(complement != kind);

        let first = store.add(a, b, kind, Notify::Both).expect("add");
        let second = store.add(b, a, complement, Notify::Both).expect("add");
        prop_assert_eq!(
            store.get(first).expect("get").link(),
            store.get(second).expect("get").link()
        );
    }

    #[test]
    fn exists_ignores_argument_order(links in arb_links(), (x, y) in arb_pair()) {
        let fx = Fixture::with_registry(registry_with_custom_pair());
        let store = fx.store();
        for (a, b, kind) in &links {
            store.add(*a, *b, *kind, Notify::Both).expect("add");
        }
        prop_assert_eq!(
            store.exists(x, y).expect("exists"),
            store.exists(y, x).expect("exists")
        );
    }

    #[test]
    fn upsert_twice_is_one_row(
        (a, b) in arb_pair(),
        kind in arb_kind(),
    ) {
        let fx = Fixture::with_registry(registry_with_custom_pair());
        let store = fx.store();
        let first = store.upsert(a, b, kind, Notify::Both).expect("upsert");
        let second = store.upsert(a, b, kind, Notify::Both).expect("upsert");
        prop_assert_eq!(first, second);
        prop_assert_eq!(fx.relationship_rows(), 1);
        prop_assert_eq!(
            store.same_type_exists(a, b, kind).expect("check"),
            SameTypeCheck::SameType(first)
        );
    }

    #[test]
    fn delete_all_removes_every_trace(links in arb_links(), doomed in 1i64..20) {
        let fx = Fixture::with_registry(registry_with_custom_pair());
        let store = fx.store();
        let doomed = BugId(doomed);
        for (a, b, kind) in &links {
            store.add(*a, *b, *kind, Notify::Both).expect("add");
        }

        store.delete_all(doomed).expect("delete all");

        prop_assert!(store.all(doomed).expect("all").is_empty());
        for bug in (1..20).map(BugId) {
            let related = store.all(bug).expect("all");
            prop_assert!(related.relationships.iter().all(|rel| !rel.link().touches(doomed)));
        }
    }
}
