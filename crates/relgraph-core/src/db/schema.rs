//! Canonical SQLite schema for relgraph.
//!
//! - `bugs` keeps the bug fields the relationship layer reads
//! - `bug_relationship` stores each relationship once, in canonical
//!   direction; there is no uniqueness constraint on the bug pair and no
//!   foreign key, so rows may reference bugs that were hard-deleted
//! - `bug_history` is the audit trail written on every relationship change

/// Migration v1: core tables.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS bugs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL,
    status INTEGER NOT NULL DEFAULT 10 CHECK (status >= 0),
    summary TEXT NOT NULL,
    handler TEXT,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS bug_relationship (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_bug_id INTEGER NOT NULL,
    destination_bug_id INTEGER NOT NULL,
    relationship_type INTEGER NOT NULL CHECK (relationship_type >= 0)
);

CREATE TABLE IF NOT EXISTS bug_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    bug_id INTEGER NOT NULL,
    event_type INTEGER NOT NULL,
    relationship_type INTEGER NOT NULL,
    other_bug_id INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL
);
";

/// Migration v2: read-path indexes.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_bug_relationship_source
    ON bug_relationship(source_bug_id, relationship_type, id);

CREATE INDEX IF NOT EXISTS idx_bug_relationship_destination
    ON bug_relationship(destination_bug_id, relationship_type, id);

CREATE INDEX IF NOT EXISTS idx_bug_history_bug
    ON bug_history(bug_id, id);

CREATE INDEX IF NOT EXISTS idx_bugs_project
    ON bugs(project_id);
";

/// Indexes expected by the relationship query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_bug_relationship_source",
    "idx_bug_relationship_destination",
    "idx_bug_history_bug",
    "idx_bugs_project",
];
