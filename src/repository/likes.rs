use rusqlite::Connection;

use super::{JoinRow, JoinTable};
use crate::db::from_epoch;
use crate::db::models::Like;

const LIKES: JoinTable = JoinTable {
    table: "likes",
    left: "user_id",
    right: "story_id",
};

fn to_like(row: JoinRow) -> Like {
    Like {
        id: row.id,
        user_id: row.left,
        story_id: row.right,
        created_at: from_epoch(row.created_at),
    }
}

/// Returns the like and whether it was newly created.
pub fn insert(conn: &Connection, user_id: &str, story_id: &str) -> rusqlite::Result<(Like, bool)> {
    let (row, created) = LIKES.insert_idempotent(conn, user_id, story_id)?;
    Ok((to_like(row), created))
}

pub fn exists(conn: &Connection, user_id: &str, story_id: &str) -> rusqlite::Result<bool> {
    LIKES.exists(conn, user_id, story_id)
}

pub fn delete(conn: &Connection, user_id: &str, story_id: &str) -> rusqlite::Result<bool> {
    LIKES.delete(conn, user_id, story_id)
}

pub fn count_for_story(conn: &Connection, story_id: &str) -> rusqlite::Result<i64> {
    LIKES.count_by_right(conn, story_id)
}
