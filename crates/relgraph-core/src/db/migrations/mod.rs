//! Versioned schema upgrades tracked in `PRAGMA user_version`.

use rusqlite::Connection;
use rusqlite::types::Type;

use super::schema;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "core tables",
        sql: schema::MIGRATION_V1_SQL,
    },
    Migration {
        version: 2,
        name: "relationship read indexes",
        sql: schema::MIGRATION_V2_SQL,
    },
];

/// Highest version in [`MIGRATIONS`].
pub const LATEST_SCHEMA_VERSION: u32 = 2;

/// Version recorded in the database file; `0` for a fresh file.
///
/// # Errors
///
/// Query failures, or a negative/oversized `user_version`.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let raw: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(err)))
}

/// Bring the schema up to [`LATEST_SCHEMA_VERSION`]. Each pending step runs
/// in its own transaction together with its `user_version` bump.
///
/// # Errors
///
/// The first failing step; earlier steps stay applied.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let start = current_schema_version(conn)?;
    let pending = MIGRATIONS.iter().filter(|step| step.version > start);

    let mut reached = start;
    for step in pending {
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", i64::from(step.version))?;
        tx.commit()?;
        tracing::debug!(version = step.version, name = step.name, "schema upgraded");
        reached = step.version;
    }

    Ok(reached)
}
