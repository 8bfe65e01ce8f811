//! relgraph-core library.
//!
//! Typed relationships between bugs: a registry of relationship types, a
//! store that keeps every link in one canonical direction, and the read
//! helpers (summary, graph) built on top of it.
//!
//! # Conventions
//!
//! - **Errors**: library operations return [`error::Result`]; setup code
//!   (config loading, opening the database) uses `anyhow::Result`.
//! - **Logging**: `tracing` macros; `info!` for mutations, `debug!` for
//!   reads and skipped steps.

pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod link;
pub mod model;
pub mod registry;
pub mod services;
pub mod store;
pub mod summary;

pub use error::{ErrorCode, RelationshipError, Result};
pub use link::Link;
pub use model::{BugId, BugRecord, ProjectId, RelatedSet, Relationship, RelationshipId, SameTypeCheck};
pub use registry::{RelationshipType, TypeRegistry};
pub use store::{Notify, RelationshipStore, ResolvePolicy};
