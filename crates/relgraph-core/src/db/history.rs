//! `bug_history` table access.

use rusqlite::{Connection, Row, params};
use serde::Serialize;

use super::now_us;
use crate::error::{RelationshipError, Result};
use crate::model::BugId;
use crate::registry::RelationshipType;
use crate::services::{HistoryEvent, HistoryLog};

/// One audit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub bug: BugId,
    #[serde(serialize_with = "serialize_event")]
    pub event: HistoryEvent,
    pub kind: RelationshipType,
    pub other: BugId,
    pub created_at_us: i64,
}

fn serialize_event<S: serde::Serializer>(
    event: &HistoryEvent,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(event.as_str())
}

/// [`HistoryLog`] over a SQLite connection.
#[derive(Debug, Clone, Copy)]
pub struct SqliteHistory<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteHistory<'a> {
    #[must_use]
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// History of one bug, oldest first.
    ///
    /// # Errors
    ///
    /// Storage failures, or an event code this build does not know.
    pub fn entries_for(&self, bug: BugId) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, bug_id, event_type, relationship_type, other_bug_id, created_at_us
             FROM bug_history
             WHERE bug_id = ?1
             ORDER BY id",
        )?;
        let raw = stmt
            .query_map(params![bug], raw_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(id, bug, code, kind, other, created_at_us)| {
                let event = HistoryEvent::from_code(code).ok_or_else(|| {
                    RelationshipError::Collaborator(anyhow::anyhow!(
                        "unknown history event code {code} in row {id}"
                    ))
                })?;
                Ok(HistoryEntry {
                    id,
                    bug,
                    event,
                    kind,
                    other,
                    created_at_us,
                })
            })
            .collect()
    }
}

type RawRow = (i64, BugId, i32, RelationshipType, BugId, i64);

fn raw_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

impl HistoryLog for SqliteHistory<'_> {
    fn log_event(
        &self,
        bug: BugId,
        event: HistoryEvent,
        kind: RelationshipType,
        other: BugId,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO bug_history (bug_id, event_type, relationship_type, other_bug_id, created_at_us)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![bug, event.code(), kind, other, now_us()],
        )?;
        tracing::debug!(%bug, event = event.as_str(), kind = %kind, %other, "history event");
        Ok(())
    }
}
