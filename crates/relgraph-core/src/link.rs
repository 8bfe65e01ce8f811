//! Directional normalization.
//!
//! Callers describe a relationship in whatever direction reads naturally
//! ("5 blocks 10"). Storage always holds the forward direction of the
//! pair ("10 depends on 5"), so each link is stored exactly once and both
//! endpoints read it back through [`Link::viewed_from`].

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::BugId;
use crate::registry::{RelationshipType, TypeRegistry};

/// A `(source, destination, type)` triple in some direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub source: BugId,
    pub destination: BugId,
    pub kind: RelationshipType,
}

impl Link {
    #[must_use]
    pub const fn new(source: BugId, destination: BugId, kind: RelationshipType) -> Self {
        Self {
            source,
            destination,
            kind,
        }
    }

    /// The same link described from the destination's side.
    ///
    /// # Errors
    ///
    /// Fails with `UnknownType` when the type is not registered.
    pub fn reversed(self, registry: &TypeRegistry) -> Result<Self> {
        Ok(Self {
            source: self.destination,
            destination: self.source,
            kind: registry.complementary(self.kind)?,
        })
    }

    /// The storage direction of this link: unchanged for forward types,
    /// reversed and complemented otherwise.
    ///
    /// # Errors
    ///
    /// Fails with `UnknownType` when the type is not registered.
    pub fn canonical(self, registry: &TypeRegistry) -> Result<Self> {
        if registry.is_forward(self.kind)? {
            Ok(self)
        } else {
            self.reversed(registry)
        }
    }

    /// The link with `bug` as its source, or `None` when `bug` is not an
    /// endpoint.
    ///
    /// # Errors
    ///
    /// Fails with `UnknownType` when the type is not registered.
    pub fn viewed_from(self, bug: BugId, registry: &TypeRegistry) -> Result<Option<Self>> {
        if self.source == bug {
            Ok(Some(self))
        } else if self.destination == bug {
            self.reversed(registry).map(Some)
        } else {
            Ok(None)
        }
    }

    #[must_use]
    pub fn other_end(self, bug: BugId) -> Option<BugId> {
        if self.source == bug {
            Some(self.destination)
        } else if self.destination == bug {
            Some(self.source)
        } else {
            None
        }
    }

    #[must_use]
    pub fn touches(self, bug: BugId) -> bool {
        self.source == bug || self.destination == bug
    }

    /// Whether both endpoints are the same bug.
    #[must_use]
    pub fn is_self_link(self) -> bool {
        self.source == self.destination
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RelationshipType as T;

    fn link(src: i64, dest: i64, kind: T) -> Link {
        Link::new(BugId(src), BugId(dest), kind)
    }

    #[test]
    fn forward_types_keep_direction() {
        let registry = TypeRegistry::builtin();
        for kind in [T::DependsOn, T::DuplicateOf, T::RelatedTo] {
            let original = link(10, 5, kind);
            assert_eq!(original.canonical(&registry).expect("known"), original);
        }
    }

    #[test]
    fn backward_types_are_flipped_and_complemented() {
        let registry = TypeRegistry::builtin();
        assert_eq!(
            link(5, 10, T::Blocks).canonical(&registry).expect("known"),
            link(10, 5, T::DependsOn)
        );
        assert_eq!(
            link(3, 4, T::HasDuplicate).canonical(&registry).expect("known"),
            link(4, 3, T::DuplicateOf)
        );
    }

    #[test]
    fn canonical_is_idempotent() {
        let registry = TypeRegistry::builtin();
        for kind in RelationshipType::BUILTIN {
            let once = link(1, 2, kind).canonical(&registry).expect("known");
            assert_eq!(once.canonical(&registry).expect("known"), once);
        }
    }

    #[test]
    fn viewed_from_recovers_caller_direction() {
        let registry = TypeRegistry::builtin();
        let stored = link(5, 10, T::Blocks).canonical(&registry).expect("known");

        assert_eq!(
            stored.viewed_from(BugId(5), &registry).expect("known"),
            Some(link(5, 10, T::Blocks))
        );
        assert_eq!(
            stored.viewed_from(BugId(10), &registry).expect("known"),
            Some(link(10, 5, T::DependsOn))
        );
        assert_eq!(stored.viewed_from(BugId(7), &registry).expect("known"), None);
    }

    #[test]
    fn unknown_type_cannot_be_normalized() {
        let registry = TypeRegistry::builtin();
        assert!(link(1, 2, T::Custom(99)).canonical(&registry).is_err());
    }

    #[test]
    fn endpoint_helpers() {
        let l = link(1, 2, T::RelatedTo);
        assert!(l.touches(BugId(1)));
        assert!(!l.touches(BugId(3)));
        assert_eq!(l.other_end(BugId(2)), Some(BugId(1)));
        assert!(link(4, 4, T::RelatedTo).is_self_link());
    }
}
