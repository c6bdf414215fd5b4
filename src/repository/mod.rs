//! Row-level access to the schema. Every function borrows a connection (or a
//! transaction, which derefs to one) so callers decide the unit of work.

pub mod deleted_accounts;
pub mod follows;
pub mod likes;
pub mod stories;
pub mod users;

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{new_id, now_epoch};

/// A two-column relationship table with a `UNIQUE(left, right)` index.
#[derive(Debug, Clone, Copy)]
pub struct JoinTable {
    pub table: &'static str,
    pub left: &'static str,
    pub right: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinRow {
    pub id: String,
    pub left: String,
    pub right: String,
    pub created_at: i64,
}

impl JoinTable {
    /// Insert the pair unless it already exists. The unique index decides,
    /// so concurrent callers all end up reading the same row back.
    /// Returns the stored row and whether this call created it.
    pub fn insert_idempotent(
        &self,
        conn: &Connection,
        left: &str,
        right: &str,
    ) -> rusqlite::Result<(JoinRow, bool)> {
        let sql = format!(
            "INSERT INTO {t} (id, {l}, {r}, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT({l}, {r}) DO NOTHING",
            t = self.table,
            l = self.left,
            r = self.right,
        );
        let inserted = conn.execute(&sql, params![new_id(), left, right, now_epoch()])?;

        let row = self
            .find(conn, left, right)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        Ok((row, inserted > 0))
    }

    pub fn find(
        &self,
        conn: &Connection,
        left: &str,
        right: &str,
    ) -> rusqlite::Result<Option<JoinRow>> {
        let sql = format!(
            "SELECT id, {l}, {r}, created_at FROM {t} WHERE {l} = ?1 AND {r} = ?2",
            t = self.table,
            l = self.left,
            r = self.right,
        );
        conn.query_row(&sql, params![left, right], |row| {
            Ok(JoinRow {
                id: row.get(0)?,
                left: row.get(1)?,
                right: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()
    }

    pub fn exists(&self, conn: &Connection, left: &str, right: &str) -> rusqlite::Result<bool> {
        let sql = format!(
            "SELECT COUNT(*) > 0 FROM {t} WHERE {l} = ?1 AND {r} = ?2",
            t = self.table,
            l = self.left,
            r = self.right,
        );
        conn.query_row(&sql, params![left, right], |row| row.get(0))
    }

    /// Returns false when there was nothing to delete.
    pub fn delete(&self, conn: &Connection, left: &str, right: &str) -> rusqlite::Result<bool> {
        let sql = format!(
            "DELETE FROM {t} WHERE {l} = ?1 AND {r} = ?2",
            t = self.table,
            l = self.left,
            r = self.right,
        );
        Ok(conn.execute(&sql, params![left, right])? > 0)
    }

    pub fn count_by_left(&self, conn: &Connection, left: &str) -> rusqlite::Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {t} WHERE {l} = ?1",
            t = self.table,
            l = self.left,
        );
        conn.query_row(&sql, params![left], |row| row.get(0))
    }

    pub fn count_by_right(&self, conn: &Connection, right: &str) -> rusqlite::Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {t} WHERE {r} = ?1",
            t = self.table,
            r = self.right,
        );
        conn.query_row(&sql, params![right], |row| row.get(0))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    const PAIRS: JoinTable = JoinTable {
        table: "follows",
        left: "follower_id",
        right: "following_id",
    };

    #[test]
    fn insert_idempotent_creates_once() {
        let pool = pool();
        let conn = pool.get().unwrap();
        insert_user(&conn, "a", "alice");
        insert_user(&conn, "b", "bob");

        let (first, created) = PAIRS.insert_idempotent(&conn, "a", "b").unwrap();
        assert!(created);
        let (second, created_again) = PAIRS.insert_idempotent(&conn, "a", "b").unwrap();
        assert!(!created_again);
        assert_eq!(first.id, second.id);
        assert_eq!(PAIRS.count_by_right(&conn, "b").unwrap(), 1);
    }

    #[test]
    fn delete_reports_missing_rows() {
        let pool = pool();
        let conn = pool.get().unwrap();
        insert_user(&conn, "a", "alice");
        insert_user(&conn, "b", "bob");

        assert!(!PAIRS.delete(&conn, "a", "b").unwrap());
        PAIRS.insert_idempotent(&conn, "a", "b").unwrap();
        assert!(PAIRS.exists(&conn, "a", "b").unwrap());
        assert!(PAIRS.delete(&conn, "a", "b").unwrap());
        assert!(!PAIRS.exists(&conn, "a", "b").unwrap());
    }

    #[test]
    fn counts_are_directional() {
        let pool = pool();
        let conn = pool.get().unwrap();
        insert_user(&conn, "a", "alice");
        insert_user(&conn, "b", "bob");
        insert_user(&conn, "c", "carol");

        PAIRS.insert_idempotent(&conn, "a", "c").unwrap();
        PAIRS.insert_idempotent(&conn, "b", "c").unwrap();

        assert_eq!(PAIRS.count_by_right(&conn, "c").unwrap(), 2);
        assert_eq!(PAIRS.count_by_left(&conn, "c").unwrap(), 0);
        assert_eq!(PAIRS.count_by_left(&conn, "a").unwrap(), 1);
    }
}
