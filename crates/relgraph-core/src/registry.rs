//! Relationship type metadata.
//!
//! # Overview
//!
//! Five types are built in, grouped into complementary pairs:
//!
//! | code | type           | name            | forward |
//! |------|----------------|-----------------|---------|
//! | 0    | `DuplicateOf`  | `duplicate-of`  | yes     |
//! | 1    | `RelatedTo`    | `related-to`    | yes     |
//! | 2    | `DependsOn`    | `parent-of`     | yes     |
//! | 3    | `Blocks`       | `child-of`      | no      |
//! | 4    | `HasDuplicate` | `has-duplicate` | no      |
//!
//! `A DependsOn B` and `B Blocks A` describe the same link: B is a child
//! that has to be resolved before A. `RelatedTo` is its own complement.
//!
//! The forward flag says whether the semantically named direction is the
//! one rows are stored in. Rows of non-forward types are rewritten to their
//! complement before storage (see [`crate::link::Link::canonical`]).
//!
//! Deployments can add custom types with [`TypeRegistryBuilder::register`].
//! The resulting [`TypeRegistry`] is immutable and is handed to the store
//! explicitly.

#![allow(clippy::module_name_repetitions)]

use std::collections::BTreeMap;
use std::fmt;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{RelationshipError, Result};

/// Tag describing the semantic link between two bugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum RelationshipType {
    DuplicateOf,
    RelatedTo,
    DependsOn,
    Blocks,
    HasDuplicate,
    /// A type registered from configuration, identified by its code.
    Custom(i32),
}

impl RelationshipType {
    /// Built-in types in code order.
    pub const BUILTIN: [Self; 5] = [
        Self::DuplicateOf,
        Self::RelatedTo,
        Self::DependsOn,
        Self::Blocks,
        Self::HasDuplicate,
    ];

    /// Stable integer code persisted in `bug_relationship.relationship_type`.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::DuplicateOf => 0,
            Self::RelatedTo => 1,
            Self::DependsOn => 2,
            Self::Blocks => 3,
            Self::HasDuplicate => 4,
            Self::Custom(code) => code,
        }
    }

    /// Inverse of [`code`](Self::code). Built-in codes always map to the
    /// built-in variant so `Custom(2)` is never produced.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Self::DuplicateOf,
            1 => Self::RelatedTo,
            2 => Self::DependsOn,
            3 => Self::Blocks,
            4 => Self::HasDuplicate,
            other => Self::Custom(other),
        }
    }

    #[must_use]
    pub const fn is_builtin(self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateOf => f.write_str("duplicate-of"),
            Self::RelatedTo => f.write_str("related-to"),
            Self::DependsOn => f.write_str("parent-of"),
            Self::Blocks => f.write_str("child-of"),
            Self::HasDuplicate => f.write_str("has-duplicate"),
            Self::Custom(code) => write!(f, "custom-{code}"),
        }
    }
}

impl From<i32> for RelationshipType {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

impl From<RelationshipType> for i32 {
    fn from(kind: RelationshipType) -> Self {
        kind.code()
    }
}

impl ToSql for RelationshipType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for RelationshipType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i32::column_result(value).map(Self::from_code)
    }
}

/// Which endpoint a description is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Destination,
}

/// Graphviz attributes for edges of one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl EdgeStyle {
    /// Render as a Graphviz attribute list body (`color="#C00000", dir=back`).
    #[must_use]
    pub fn to_dot_attrs(&self) -> String {
        let mut attrs = Vec::new();
        if let Some(color) = &self.color {
            attrs.push(format!("color=\"{color}\""));
        }
        if let Some(style) = &self.style {
            attrs.push(format!("style={style}"));
        }
        if let Some(dir) = &self.dir {
            attrs.push(format!("dir={dir}"));
        }
        attrs.join(", ")
    }
}

/// Metadata registered for one relationship type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Stable API name, e.g. `parent-of`.
    pub name: String,
    /// Human description from the source bug's point of view.
    pub description: String,
    pub complementary: RelationshipType,
    /// Whether rows of this type are stored in the named direction.
    pub forward: bool,
    #[serde(default)]
    pub edge_style: Option<EdgeStyle>,
}

impl TypeInfo {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        complementary: RelationshipType,
        forward: bool,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            complementary,
            forward,
            edge_style: None,
        }
    }

    #[must_use]
    pub fn with_edge_style(mut self, style: EdgeStyle) -> Self {
        self.edge_style = Some(style);
        self
    }
}

fn builtin_info(kind: RelationshipType) -> Option<TypeInfo> {
    use RelationshipType as T;

    let info = match kind {
        T::DependsOn => TypeInfo::new("parent-of", "depends on", T::Blocks, true).with_edge_style(
            EdgeStyle {
                color: Some("#C00000".to_string()),
                style: None,
                dir: Some("back".to_string()),
            },
        ),
        T::Blocks => TypeInfo::new("child-of", "blocks", T::DependsOn, false).with_edge_style(
            EdgeStyle {
                color: Some("#C00000".to_string()),
                style: None,
                dir: Some("forward".to_string()),
            },
        ),
        T::DuplicateOf => TypeInfo::new("duplicate-of", "duplicate of", T::HasDuplicate, true)
            .with_edge_style(EdgeStyle {
                color: Some("#808080".to_string()),
                style: Some("dashed".to_string()),
                dir: None,
            }),
        T::HasDuplicate => TypeInfo::new("has-duplicate", "has duplicate", T::DuplicateOf, false),
        T::RelatedTo => TypeInfo::new("related-to", "related to", T::RelatedTo, true),
        T::Custom(_) => return None,
    };
    Some(info)
}

/// Immutable lookup table from relationship type to its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRegistry {
    types: BTreeMap<RelationshipType, TypeInfo>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TypeRegistry {
    /// Registry holding only the built-in types.
    #[must_use]
    pub fn builtin() -> Self {
        let types = RelationshipType::BUILTIN
            .iter()
            .filter_map(|kind| builtin_info(*kind).map(|info| (*kind, info)))
            .collect();
        Self { types }
    }

    /// Start a registry from the built-ins and add custom types to it.
    #[must_use]
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder {
            registry: Self::builtin(),
        }
    }

    /// Metadata for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::UnknownType`] when `kind` is not registered.
    pub fn info(&self, kind: RelationshipType) -> Result<&TypeInfo> {
        self.types
            .get(&kind)
            .ok_or(RelationshipError::UnknownType(kind.code()))
    }

    #[must_use]
    pub fn contains(&self, kind: RelationshipType) -> bool {
        self.types.contains_key(&kind)
    }

    /// The type describing the same link from the opposite endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::UnknownType`] when `kind` is not registered.
    pub fn complementary(&self, kind: RelationshipType) -> Result<RelationshipType> {
        self.info(kind).map(|info| info.complementary)
    }

    /// # Errors
    ///
    /// Returns [`RelationshipError::UnknownType`] when `kind` is not registered.
    pub fn is_forward(&self, kind: RelationshipType) -> Result<bool> {
        self.info(kind).map(|info| info.forward)
    }

    /// API name of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::UnknownType`] when `kind` is not registered.
    pub fn display_name(&self, kind: RelationshipType) -> Result<&str> {
        self.info(kind).map(|info| info.name.as_str())
    }

    /// Human description of `kind` as seen from `side`. The destination
    /// side reads the description of the complementary type.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::UnknownType`] when `kind` or its
    /// complement is not registered.
    pub fn description(&self, kind: RelationshipType, side: Side) -> Result<&str> {
        let info = self.info(kind)?;
        match side {
            Side::Source => Ok(info.description.as_str()),
            Side::Destination => self
                .info(info.complementary)
                .map(|complement| complement.description.as_str()),
        }
    }

    /// Resolve a user-supplied type: numeric code, API name or description.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::UnknownType`] when nothing matches; the
    /// code is the parsed number or `-1` for unmatched text.
    pub fn parse(&self, raw: &str) -> Result<RelationshipType> {
        let raw = raw.trim();
        if let Ok(code) = raw.parse::<i32>() {
            let kind = RelationshipType::from_code(code);
            return if self.contains(kind) {
                Ok(kind)
            } else {
                Err(RelationshipError::UnknownType(code))
            };
        }

        let wanted = raw.replace('_', "-");
        self.types
            .iter()
            .find(|(_, info)| {
                info.name.eq_ignore_ascii_case(&wanted)
                    || info.description.eq_ignore_ascii_case(raw)
                    || info.description.replace(' ', "-").eq_ignore_ascii_case(&wanted)
            })
            .map(|(kind, _)| *kind)
            .ok_or(RelationshipError::UnknownType(-1))
    }

    /// Registered types in code order.
    pub fn iter(&self) -> impl Iterator<Item = (RelationshipType, &TypeInfo)> {
        self.types.iter().map(|(kind, info)| (*kind, info))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Collects custom types at startup before freezing them into a
/// [`TypeRegistry`].
#[derive(Debug, Clone)]
pub struct TypeRegistryBuilder {
    registry: TypeRegistry,
}

impl TypeRegistryBuilder {
    /// Add one type.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::DuplicateType`] when the code or the
    /// name is already registered, and [`RelationshipError::InvalidRegistry`]
    /// for negative codes.
    pub fn register(&mut self, kind: RelationshipType, info: TypeInfo) -> Result<&mut Self> {
        let kind = RelationshipType::from_code(kind.code());
        if kind.code() < 0 {
            return Err(RelationshipError::InvalidRegistry(format!(
                "relationship type codes must be non-negative, got {}",
                kind.code()
            )));
        }
        if self.registry.types.contains_key(&kind)
            || self
                .registry
                .types
                .values()
                .any(|existing| existing.name.eq_ignore_ascii_case(&info.name))
        {
            return Err(RelationshipError::DuplicateType {
                code: kind.code(),
                name: info.name,
            });
        }

        tracing::debug!(code = kind.code(), name = %info.name, "registered relationship type");
        self.registry.types.insert(kind, info);
        Ok(self)
    }

    /// Validate pairings and freeze the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::InvalidRegistry`] when a complementary
    /// type is missing, pairs do not point back at each other, or the
    /// forward flags of a pair are inconsistent.
    pub fn build(self) -> Result<TypeRegistry> {
        let types = &self.registry.types;
        for (kind, info) in types {
            let Some(complement) = types.get(&info.complementary) else {
                return Err(RelationshipError::InvalidRegistry(format!(
                    "type {} ('{}') names unregistered complementary type {}",
                    kind.code(),
                    info.name,
                    info.complementary.code()
                )));
            };

            if complement.complementary != *kind {
                return Err(RelationshipError::InvalidRegistry(format!(
                    "type {} ('{}') is complemented by {} but {} is complemented by {}",
                    kind.code(),
                    info.name,
                    info.complementary.code(),
                    info.complementary.code(),
                    complement.complementary.code()
                )));
            }

            if info.complementary == *kind {
                if !info.forward {
                    return Err(RelationshipError::InvalidRegistry(format!(
                        "self-complementary type {} ('{}') must be forward",
                        kind.code(),
                        info.name
                    )));
                }
            } else if info.forward == complement.forward {
                return Err(RelationshipError::InvalidRegistry(format!(
                    "exactly one of types {} and {} must be forward",
                    kind.code(),
                    info.complementary.code()
                )));
            }
        }

        Ok(self.registry)
    }
}
