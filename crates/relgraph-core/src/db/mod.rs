//! SQLite persistence for relationships, bug records and history.
//!
//! Connections run in WAL mode with a 5 s busy timeout. Relationship rows
//! carry no foreign keys, so they can outlive a hard-deleted bug.

pub mod bugs;
pub mod history;
pub mod migrations;
pub mod relationships;
pub mod schema;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::Connection;

pub use bugs::{NewBug, SqliteBugs};
pub use history::{HistoryEntry, SqliteHistory};
pub use relationships::SqliteRelationships;

use crate::registry::TypeRegistry;
use crate::services::Notifier;
use crate::store::{RelationshipStore, ResolvePolicy, Services};

/// How long a writer waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open the database file, creating it and its directory when missing,
/// and upgrade the schema.
///
/// # Errors
///
/// Filesystem, pragma and migration failures, with the path in context.
pub fn open_database(path: &Path) -> Result<Connection> {
    let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create directory {} for the database", dir.display()))?;
    }

    let mut conn =
        Connection::open(path).with_context(|| format!("open database {}", path.display()))?;
    apply_pragmas(&conn).context("set connection pragmas")?;
    let version = migrations::migrate(&mut conn)
        .with_context(|| format!("upgrade schema of {}", path.display()))?;
    tracing::debug!(path = %path.display(), version, "database ready");

    Ok(conn)
}

/// Private in-memory database at the latest schema.
///
/// # Errors
///
/// Migration failures.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("open in-memory database")?;
    migrations::migrate(&mut conn).context("upgrade in-memory schema")?;
    Ok(conn)
}

fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        tracing::warn!(%mode, "database did not switch to WAL");
    }
    Ok(())
}

/// Wire a [`RelationshipStore`] to the SQLite collaborators on `conn`.
pub fn store<'a>(
    conn: &'a Connection,
    registry: &'a TypeRegistry,
    policy: ResolvePolicy,
    read_only_status: u16,
    notifier: impl Notifier + 'a,
) -> RelationshipStore<'a> {
    RelationshipStore::new(
        registry,
        policy,
        Services {
            relationships: Box::new(SqliteRelationships::new(conn)),
            bugs: Box::new(SqliteBugs::new(conn).with_read_only_status(read_only_status)),
            history: Box::new(SqliteHistory::new(conn)),
            notifier: Box::new(notifier),
        },
    )
}

/// Current wall-clock time in microseconds since the Unix epoch.
pub(crate) fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_database_uses_wal_and_busy_timeout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = open_database(&dir.path().join("nested/relgraph.sqlite3")).expect("open");

        let mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("journal_mode");
        assert_eq!(mode.to_ascii_lowercase(), "wal");

        let timeout_ms: i64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("busy_timeout");
        assert_eq!(timeout_ms, 5_000);
        assert_eq!(
            migrations::current_schema_version(&conn).expect("version"),
            migrations::LATEST_SCHEMA_VERSION
        );
    }

    #[test]
    fn rows_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("relgraph.sqlite3");
        open_database(&path)
            .expect("open")
            .execute(
                "INSERT INTO bug_relationship (source_bug_id, destination_bug_id, relationship_type)
                 VALUES (1, 2, 1)",
                [],
            )
            .expect("insert");

        let count: i64 = open_database(&path)
            .expect("reopen")
            .query_row("SELECT COUNT(*) FROM bug_relationship", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1);
    }

    #[test]
    fn wired_store_sees_its_own_writes() {
        use crate::model::{BugId, status};
        use crate::registry::RelationshipType;
        use crate::services::RecordingNotifier;
        use crate::store::Notify;

        let conn = open_in_memory().expect("db");
        let registry = TypeRegistry::builtin();
        let notifier = RecordingNotifier::new();
        let store = store(&conn, &registry, ResolvePolicy::default(), status::RESOLVED, &notifier);

        let id = store
            .add(BugId(1), BugId(2), RelationshipType::RelatedTo, Notify::Both)
            .expect("add");
        assert_eq!(store.exists(BugId(2), BugId(1)).expect("exists"), Some(id));
        assert_eq!(notifier.len(), 1);
    }
}
