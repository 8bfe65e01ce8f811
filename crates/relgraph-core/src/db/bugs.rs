//! `bugs` table access.
//!
//! Bug records are owned by the wider tracker; this module only provides
//! the fields the relationship layer reads plus the handful of writes the
//! CLI needs to manage a standalone database.

use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde::{Deserialize, Serialize};

use super::now_us;
use crate::error::Result;
use crate::model::{BugId, BugRecord, ProjectId, status};
use crate::services::BugService;

const SELECT_COLUMNS: &str = "SELECT id, project_id, status, summary, handler, updated_at_us FROM bugs";

/// Fields for a new bug row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBug {
    pub project_id: ProjectId,
    pub summary: String,
    pub status: u16,
    pub handler: Option<String>,
}

impl NewBug {
    #[must_use]
    pub fn new(project_id: ProjectId, summary: impl Into<String>) -> Self {
        Self {
            project_id,
            summary: summary.into(),
            status: status::NEW,
            handler: None,
        }
    }

    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }
}

/// [`BugService`] over a SQLite connection.
#[derive(Debug, Clone, Copy)]
pub struct SqliteBugs<'a> {
    conn: &'a Connection,
    read_only_status: u16,
}

impl<'a> SqliteBugs<'a> {
    #[must_use]
    pub const fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            read_only_status: status::RESOLVED,
        }
    }

    /// Bugs at or above this status are read-only.
    #[must_use]
    pub const fn with_read_only_status(mut self, status: u16) -> Self {
        self.read_only_status = status;
        self
    }

    /// Insert a bug and return its id.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn create(&self, bug: &NewBug) -> Result<BugId> {
        let now = now_us();
        self.conn.execute(
            "INSERT INTO bugs (project_id, status, summary, handler, created_at_us, updated_at_us)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![bug.project_id, bug.status, bug.summary, bug.handler, now],
        )?;
        let id = BugId(self.conn.last_insert_rowid());
        tracing::info!(bug = %id, project = %bug.project_id, "created bug");
        Ok(id)
    }

    /// Change a bug's status. Returns `false` when the bug does not exist.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn set_status(&self, bug: BugId, status: u16) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE bugs SET status = ?1, updated_at_us = ?2 WHERE id = ?3",
            params![status, now_us(), bug],
        )?;
        Ok(changed > 0)
    }

    /// Hard-delete a bug row. Relationship rows are left to the caller.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn remove(&self, bug: BugId) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM bugs WHERE id = ?1", params![bug])?;
        Ok(changed > 0)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<BugRecord> {
    Ok(BugRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        status: row.get(2)?,
        summary: row.get(3)?,
        handler: row.get(4)?,
        updated_at_us: row.get(5)?,
    })
}

impl BugService for SqliteBugs<'_> {
    fn load(&self, bug: BugId) -> Result<Option<BugRecord>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let record = self
            .conn
            .query_row(&sql, params![bug], row_to_record)
            .optional()?;
        Ok(record)
    }

    fn load_many(&self, bugs: &[BugId]) -> Result<HashMap<BugId, BugRecord>> {
        let mut records = HashMap::with_capacity(bugs.len());
        // Stay well below SQLITE_MAX_VARIABLE_NUMBER.
        for chunk in bugs.chunks(500) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("{SELECT_COLUMNS} WHERE id IN ({placeholders})");
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), row_to_record)?;
            for record in rows {
                let record = record?;
                records.insert(record.id, record);
            }
        }
        Ok(records)
    }

    fn touch(&self, bug: BugId) -> Result<()> {
        self.conn.execute(
            "UPDATE bugs SET updated_at_us = MAX(updated_at_us + 1, ?1) WHERE id = ?2",
            params![now_us(), bug],
        )?;
        Ok(())
    }

    fn is_read_only(&self, bug: BugId) -> Result<bool> {
        Ok(self
            .load(bug)?
            .is_some_and(|record| record.status >= self.read_only_status))
    }
}
