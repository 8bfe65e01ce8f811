//! Identifiers and row types shared by the store, its collaborators and the
//! presentation helpers.
//!
//! Relationship rows are always held in canonical storage direction; see
//! [`crate::link`] for how a caller's direction maps onto them.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::link::Link;
use crate::registry::RelationshipType;

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().trim_start_matches('#').parse().map(Self)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.0))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map(Self)
            }
        }
    };
}

integer_id!(
    /// Identifier of a bug (issue) record.
    BugId
);

integer_id!(
    /// Identifier of a `bug_relationship` row.
    RelationshipId
);

integer_id!(
    /// Identifier of the project a bug belongs to.
    ProjectId
);

impl BugId {
    /// Zero-padded display form used in summaries and graph labels.
    #[must_use]
    pub fn padded(self) -> String {
        format!("{:07}", self.0)
    }
}

/// Well-known workflow status values. Anything at or above
/// [`status::RESOLVED`] counts as resolved under the default policy.
pub mod status {
    pub const NEW: u16 = 10;
    pub const FEEDBACK: u16 = 20;
    pub const ACKNOWLEDGED: u16 = 30;
    pub const CONFIRMED: u16 = 40;
    pub const ASSIGNED: u16 = 50;
    pub const RESOLVED: u16 = 80;
    pub const CLOSED: u16 = 90;

    const NAMES: &[(&str, u16)] = &[
        ("new", NEW),
        ("feedback", FEEDBACK),
        ("acknowledged", ACKNOWLEDGED),
        ("confirmed", CONFIRMED),
        ("assigned", ASSIGNED),
        ("resolved", RESOLVED),
        ("closed", CLOSED),
    ];

    /// Parse a status name or raw numeric value.
    #[must_use]
    pub fn parse(raw: &str) -> Option<u16> {
        let raw = raw.trim();
        if let Ok(value) = raw.parse::<u16>() {
            return Some(value);
        }
        NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(raw))
            .map(|(_, value)| *value)
    }

    /// Name of a well-known status, or the number itself.
    #[must_use]
    pub fn label(value: u16) -> String {
        NAMES
            .iter()
            .find(|(_, v)| *v == value)
            .map_or_else(|| value.to_string(), |(name, _)| (*name).to_string())
    }
}

/// A stored relationship row, in canonical direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub source: BugId,
    pub destination: BugId,
    pub kind: RelationshipType,
}

impl Relationship {
    /// The row as a directed link.
    #[must_use]
    pub const fn link(&self) -> Link {
        Link::new(self.source, self.destination, self.kind)
    }
}

/// A relationship row enriched with the project of each endpoint.
///
/// A project is `None` when the bug record no longer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugRelationship {
    pub id: RelationshipId,
    pub source: BugId,
    pub source_project: Option<ProjectId>,
    pub destination: BugId,
    pub destination_project: Option<ProjectId>,
    pub kind: RelationshipType,
}

impl BugRelationship {
    /// True when both projects are known and differ.
    #[must_use]
    pub fn crosses_projects(&self) -> bool {
        matches!(
            (self.source_project, self.destination_project),
            (Some(src), Some(dest)) if src != dest
        )
    }

    /// The other endpoint, when `bug` is one of the two.
    #[must_use]
    pub fn other_end(&self, bug: BugId) -> Option<BugId> {
        self.link().other_end(bug)
    }

    #[must_use]
    pub const fn link(&self) -> Link {
        Link::new(self.source, self.destination, self.kind)
    }
}

/// Every relationship touching one bug.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedSet {
    /// Relationships with the bug as source, then as destination.
    pub relationships: Vec<BugRelationship>,
    pub crosses_projects: bool,
}

impl RelatedSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.relationships.len()
    }
}

/// Outcome of looking for an existing relationship between two bugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameTypeCheck {
    /// The bugs are not related.
    NoRelationship,
    /// Already related with the requested effective type and direction.
    SameType(RelationshipId),
    /// Related with another type; the row is a replacement candidate.
    DifferentType(RelationshipId),
}

impl SameTypeCheck {
    /// Id of the existing relationship, if any.
    #[must_use]
    pub const fn existing(self) -> Option<RelationshipId> {
        match self {
            Self::NoRelationship => None,
            Self::SameType(id) | Self::DifferentType(id) => Some(id),
        }
    }
}

/// The fields of a bug record the relationship layer reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugRecord {
    pub id: BugId,
    pub project_id: ProjectId,
    pub status: u16,
    pub summary: String,
    pub handler: Option<String>,
    pub updated_at_us: i64,
}
