use rusqlite::{params, Connection};

use crate::db::models::DeletedAccount;
use crate::db::{from_epoch, new_id, now_epoch};

/// Append an audit record. The table is append-only.
pub fn insert(
    conn: &Connection,
    username: &str,
    email: &str,
    reason: Option<&str>,
    feedback: Option<&str>,
) -> rusqlite::Result<DeletedAccount> {
    let id = new_id();
    let deleted_at = now_epoch();
    conn.execute(
        "INSERT INTO deleted_accounts (id, username, email, reason, feedback, deleted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, username, email, reason, feedback, deleted_at],
    )?;

    Ok(DeletedAccount {
        id,
        username: username.to_string(),
        email: email.to_string(),
        reason: reason.map(str::to_string),
        feedback: feedback.map(str::to_string),
        deleted_at: from_epoch(deleted_at),
    })
}

pub fn list_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Vec<DeletedAccount>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, email, reason, feedback, deleted_at
         FROM deleted_accounts WHERE email = ?1 ORDER BY deleted_at DESC",
    )?;
    let rows = stmt.query_map(params![email], |row| {
        Ok(DeletedAccount {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            reason: row.get(3)?,
            feedback: row.get(4)?,
            deleted_at: from_epoch(row.get(5)?),
        })
    })?;
    rows.collect()
}
