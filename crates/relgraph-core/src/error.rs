use std::fmt;

use crate::model::{BugId, RelationshipId};

/// Crate-wide result alias.
pub type Result<T, E = RelationshipError> = std::result::Result<T, E>;

/// Machine-readable error codes for callers that branch on failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidRegistry,
    RelationshipNotFound,
    UnknownRelationshipType,
    SelfReference,
    BugNotFound,
    UnresolvedChildren,
    PermissionDenied,
    StorageFailure,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InvalidRegistry => "E1002",
            Self::RelationshipNotFound => "E2001",
            Self::UnknownRelationshipType => "E2002",
            Self::SelfReference => "E2003",
            Self::BugNotFound => "E2004",
            Self::UnresolvedChildren => "E2005",
            Self::PermissionDenied => "E3001",
            Self::StorageFailure => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidRegistry => "Invalid relationship type registry",
            Self::RelationshipNotFound => "Relationship not found",
            Self::UnknownRelationshipType => "Unknown relationship type",
            Self::SelfReference => "Bug cannot be related to itself",
            Self::BugNotFound => "Bug not found",
            Self::UnresolvedChildren => "Bug depends on unresolved bugs",
            Self::PermissionDenied => "Permission denied",
            Self::StorageFailure => "Storage failure",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in relgraph.toml and retry."),
            Self::InvalidRegistry => Some(
                "Every custom relationship type needs a unique code and name and a registered complementary type.",
            ),
            Self::RelationshipNotFound | Self::BugNotFound => None,
            Self::UnknownRelationshipType => Some("Run `relgraph types` to list registered types."),
            Self::SelfReference => Some("Pick two different bugs."),
            Self::UnresolvedChildren => {
                Some("Resolve the bugs it depends on first, or force the status change.")
            }
            Self::PermissionDenied => {
                Some("Raise [access] current_level in relgraph.toml, or reopen the bug.")
            }
            Self::StorageFailure => Some("Check that the database file is writable and not locked."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failures raised by the relationship registry and store.
#[derive(Debug, thiserror::Error)]
pub enum RelationshipError {
    /// A type code with no registry entry reached a metadata lookup.
    #[error("unknown relationship type code {0}")]
    UnknownType(i32),

    #[error("relationship type {code} ('{name}') is already registered")]
    DuplicateType { code: i32, name: String },

    #[error("invalid relationship type registry: {0}")]
    InvalidRegistry(String),

    #[error("relationship {0} not found")]
    NotFound(RelationshipId),

    /// The bug handed to an endpoint lookup is neither side of the relationship.
    #[error("bug {bug} is not an endpoint of relationship {relationship}")]
    NotAnEndpoint {
        relationship: RelationshipId,
        bug: BugId,
    },

    #[error("bug {0} cannot be related to itself")]
    SelfReference(BugId),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl RelationshipError {
    /// The stable error code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownType(_) => ErrorCode::UnknownRelationshipType,
            Self::DuplicateType { .. } | Self::InvalidRegistry(_) => ErrorCode::InvalidRegistry,
            Self::NotFound(_) | Self::NotAnEndpoint { .. } => ErrorCode::RelationshipNotFound,
            Self::SelfReference(_) => ErrorCode::SelfReference,
            Self::Storage(_) => ErrorCode::StorageFailure,
            Self::Collaborator(_) => ErrorCode::InternalUnexpected,
        }
    }
}
