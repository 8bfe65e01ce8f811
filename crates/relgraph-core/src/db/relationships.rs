//! `bug_relationship` table access.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::Result;
use crate::link::Link;
use crate::model::{BugId, Relationship, RelationshipId};
use crate::services::RelationshipRepository;

const SELECT_COLUMNS: &str =
    "SELECT id, source_bug_id, destination_bug_id, relationship_type FROM bug_relationship";

/// [`RelationshipRepository`] over a SQLite connection.
#[derive(Debug, Clone, Copy)]
pub struct SqliteRelationships<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteRelationships<'a> {
    #[must_use]
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn select_where(&self, clause: &str, bug: BugId) -> Result<Vec<Relationship>> {
        let sql = format!("{SELECT_COLUMNS} WHERE {clause} ORDER BY relationship_type, id");
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params![bug], row_to_relationship)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn row_to_relationship(row: &Row<'_>) -> rusqlite::Result<Relationship> {
    Ok(Relationship {
        id: row.get(0)?,
        source: row.get(1)?,
        destination: row.get(2)?,
        kind: row.get(3)?,
    })
}

impl RelationshipRepository for SqliteRelationships<'_> {
    fn insert(&self, link: &Link) -> Result<RelationshipId> {
        self.conn.execute(
            "INSERT INTO bug_relationship (source_bug_id, destination_bug_id, relationship_type)
             VALUES (?1, ?2, ?3)",
            params![link.source, link.destination, link.kind],
        )?;
        Ok(RelationshipId(self.conn.last_insert_rowid()))
    }

    fn update(&self, id: RelationshipId, link: &Link) -> Result<()> {
        self.conn.execute(
            "UPDATE bug_relationship
             SET source_bug_id = ?1, destination_bug_id = ?2, relationship_type = ?3
             WHERE id = ?4",
            params![link.source, link.destination, link.kind, id],
        )?;
        Ok(())
    }

    fn delete(&self, id: RelationshipId) -> Result<()> {
        self.conn
            .execute("DELETE FROM bug_relationship WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn get(&self, id: RelationshipId) -> Result<Option<Relationship>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![id], row_to_relationship)
            .optional()?;
        Ok(row)
    }

    fn find_between(&self, a: BugId, b: BugId) -> Result<Option<Relationship>> {
        let sql = format!(
            "{SELECT_COLUMNS}
             WHERE (source_bug_id = ?1 AND destination_bug_id = ?2)
                OR (source_bug_id = ?2 AND destination_bug_id = ?1)
             ORDER BY id
             LIMIT 1"
        );
        let row = self
            .conn
            .query_row(&sql, params![a, b], row_to_relationship)
            .optional()?;
        Ok(row)
    }

    fn by_source(&self, bug: BugId) -> Result<Vec<Relationship>> {
        self.select_where("source_bug_id = ?1", bug)
    }

    fn by_destination(&self, bug: BugId) -> Result<Vec<Relationship>> {
        self.select_where("destination_bug_id = ?1", bug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::registry::RelationshipType as T;

    fn link(src: i64, dest: i64, kind: T) -> Link {
        Link::new(BugId(src), BugId(dest), kind)
    }

    #[test]
    fn insert_then_get() {
        let conn = open_in_memory().expect("db");
        let repo = SqliteRelationships::new(&conn);

        let id = repo.insert(&link(10, 5, T::DependsOn)).expect("insert");
        let row = repo.get(id).expect("get").expect("present");
        assert_eq!(row.link(), link(10, 5, T::DependsOn));
        assert_eq!(repo.get(RelationshipId(999)).expect("get"), None);
    }

    #[test]
    fn find_between_matches_either_direction() {
        let conn = open_in_memory().expect("db");
        let repo = SqliteRelationships::new(&conn);
        let id = repo.insert(&link(1, 2, T::RelatedTo)).expect("insert");

        let forward = repo.find_between(BugId(1), BugId(2)).expect("query");
        let backward = repo.find_between(BugId(2), BugId(1)).expect("query");
        assert_eq!(forward.map(|r| r.id), Some(id));
        assert_eq!(backward.map(|r| r.id), Some(id));
        assert_eq!(repo.find_between(BugId(1), BugId(3)).expect("query"), None);
    }

    #[test]
    fn listings_are_ordered_by_type_then_id() {
        let conn = open_in_memory().expect("db");
        let repo = SqliteRelationships::new(&conn);
        let related = repo.insert(&link(1, 2, T::RelatedTo)).expect("insert");
        let parent = repo.insert(&link(1, 3, T::DependsOn)).expect("insert");
        let dup = repo.insert(&link(1, 4, T::DuplicateOf)).expect("insert");
        let related_again = repo.insert(&link(1, 5, T::RelatedTo)).expect("insert");
        repo.insert(&link(6, 1, T::RelatedTo)).expect("insert");

        let ids: Vec<_> = repo
            .by_source(BugId(1))
            .expect("query")
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![dup, related, related_again, parent]);

        let incoming = repo.by_destination(BugId(1)).expect("query");
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].source, BugId(6));
    }

    #[test]
    fn update_and_delete_rows() {
        let conn = open_in_memory().expect("db");
        let repo = SqliteRelationships::new(&conn);
        let id = repo.insert(&link(1, 2, T::RelatedTo)).expect("insert");

        repo.update(id, &link(2, 1, T::DuplicateOf)).expect("update");
        let row = repo.get(id).expect("get").expect("present");
        assert_eq!(row.link(), link(2, 1, T::DuplicateOf));

        repo.delete(id).expect("delete");
        assert_eq!(repo.get(id).expect("get"), None);
    }
}
