use rusqlite::Connection;

use super::{JoinRow, JoinTable};
use crate::db::from_epoch;
use crate::db::models::Follow;

const FOLLOWS: JoinTable = JoinTable {
    table: "follows",
    left: "follower_id",
    right: "following_id",
};

fn to_follow(row: JoinRow) -> Follow {
    Follow {
        id: row.id,
        follower_id: row.left,
        following_id: row.right,
        created_at: from_epoch(row.created_at),
    }
}

/// Returns the follow and whether it was newly created.
pub fn insert(
    conn: &Connection,
    follower_id: &str,
    following_id: &str,
) -> rusqlite::Result<(Follow, bool)> {
    let (row, created) = FOLLOWS.insert_idempotent(conn, follower_id, following_id)?;
    Ok((to_follow(row), created))
}

pub fn exists(conn: &Connection, follower_id: &str, following_id: &str) -> rusqlite::Result<bool> {
    FOLLOWS.exists(conn, follower_id, following_id)
}

pub fn delete(conn: &Connection, follower_id: &str, following_id: &str) -> rusqlite::Result<bool> {
    FOLLOWS.delete(conn, follower_id, following_id)
}

pub fn followers_count(conn: &Connection, user_id: &str) -> rusqlite::Result<i64> {
    FOLLOWS.count_by_right(conn, user_id)
}

pub fn following_count(conn: &Connection, user_id: &str) -> rusqlite::Result<i64> {
    FOLLOWS.count_by_left(conn, user_id)
}
