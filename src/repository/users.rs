use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::db::models::{NewUser, User, UserUpdate};
use crate::db::{from_epoch, new_id, now_epoch};

const USER_COLUMNS: &str = "id, kinde_id, username, email, first_name, last_name, \
    date_of_birth, country, avatar_style, is_suspended, is_password_reset_requested, \
    login_count, last_login, user_since, created_at, updated_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let avatar_style: Option<String> = row.get(8)?;
    Ok(User {
        id: row.get(0)?,
        kinde_id: row.get(1)?,
        username: row.get(2)?,
        email: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        date_of_birth: row.get(6)?,
        country: row.get(7)?,
        avatar_style: avatar_style.and_then(|s| s.parse().ok()),
        is_suspended: row.get(9)?,
        is_password_reset_requested: row.get(10)?,
        login_count: row.get(11)?,
        last_login: from_epoch(row.get(12)?),
        user_since: from_epoch(row.get(13)?),
        created_at: from_epoch(row.get(14)?),
        updated_at: from_epoch(row.get(15)?),
    })
}

fn find_by(conn: &Connection, column: &str, value: &str) -> rusqlite::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    conn.query_row(&sql, params![value], map_user).optional()
}

pub fn insert(conn: &Connection, user: &NewUser) -> rusqlite::Result<User> {
    let id = new_id();
    let now = now_epoch();
    conn.execute(
        "INSERT INTO users (id, kinde_id, username, email, first_name, last_name,
                            login_count, last_login, user_since, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7, ?7, ?7)",
        params![
            id,
            user.kinde_id,
            user.username,
            user.email,
            user.first_name,
            user.last_name,
            now
        ],
    )?;

    find_by_id(conn, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn find_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    find_by(conn, "id", id)
}

pub fn find_by_kinde_id(conn: &Connection, kinde_id: &str) -> rusqlite::Result<Option<User>> {
    find_by(conn, "kinde_id", kinde_id)
}

pub fn find_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<User>> {
    find_by(conn, "username", username)
}

pub fn find_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    find_by(conn, "email", email)
}

pub fn username_exists(conn: &Connection, username: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )
}

/// Apply the set fields of `update` and stamp `updated_at`. `created_at` is
/// never written here. Returns `None` when no row has this id.
pub fn update(conn: &Connection, id: &str, update: &UserUpdate) -> rusqlite::Result<Option<User>> {
    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    let text = |v: &Option<String>| v.as_ref().map(|s| Value::Text(s.clone()));
    let flag = |v: Option<bool>| v.map(|b| Value::Integer(b as i64));

    let fields = [
        ("username = ?", text(&update.username)),
        ("email = ?", text(&update.email)),
        ("first_name = ?", text(&update.first_name)),
        ("last_name = ?", text(&update.last_name)),
        ("date_of_birth = ?", text(&update.date_of_birth)),
        ("country = ?", text(&update.country)),
        (
            "avatar_style = ?",
            update
                .avatar_style
                .map(|s| Value::Text(s.as_str().to_string())),
        ),
        ("is_suspended = ?", flag(update.is_suspended)),
        (
            "is_password_reset_requested = ?",
            flag(update.is_password_reset_requested),
        ),
    ];
    for (clause, value) in fields {
        if let Some(value) = value {
            sets.push(clause);
            values.push(value);
        }
    }

    sets.push("updated_at = ?");
    values.push(Value::Integer(now_epoch()));
    values.push(Value::Text(id.to_string()));

    let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
    if conn.execute(&sql, params_from_iter(values))? == 0 {
        return Ok(None);
    }
    find_by_id(conn, id)
}

/// Single conditional update so concurrent logins never lose an increment.
/// Returns false when no user has this external id.
pub fn increment_login_count(conn: &Connection, kinde_id: &str) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE users SET login_count = login_count + 1, last_login = ?2, updated_at = ?2
         WHERE kinde_id = ?1",
        params![kinde_id, now_epoch()],
    )?;
    Ok(rows > 0)
}

pub fn delete(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM users WHERE id = ?1", params![id])? > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::AvatarStyle;
    use crate::repository::test_support::pool;

    fn alice() -> NewUser {
        NewUser {
            kinde_id: "kp_alice".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            first_name: Some("Alice".into()),
            last_name: None,
        }
    }

    #[test]
    fn insert_defaults_login_count_to_one() {
        let pool = pool();
        let conn = pool.get().unwrap();
        let user = insert(&conn, &alice()).unwrap();

        assert_eq!(user.login_count, 1);
        assert!(!user.is_suspended);
        assert!(user.avatar_style.is_none());

        let found = find_by_kinde_id(&conn, "kp_alice").unwrap().unwrap();
        assert_eq!(found, user);
    }

    #[test]
    fn lookups_return_none_when_missing() {
        let pool = pool();
        let conn = pool.get().unwrap();
        assert!(find_by_username(&conn, "ghost").unwrap().is_none());
        assert!(find_by_email(&conn, "ghost@example.com").unwrap().is_none());
        assert!(find_by_id(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn update_touches_only_given_fields() {
        let pool = pool();
        let conn = pool.get().unwrap();
        let user = insert(&conn, &alice()).unwrap();

        let updated = update(
            &conn,
            &user.id,
            &UserUpdate {
                country: Some("NL".into()),
                avatar_style: Some(AvatarStyle::PixelArt),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();

        assert_eq!(updated.country.as_deref(), Some("NL"));
        assert_eq!(updated.avatar_style, Some(AvatarStyle::PixelArt));
        assert_eq!(updated.first_name.as_deref(), Some("Alice"));
        assert_eq!(updated.created_at, user.created_at);
    }

    #[test]
    fn update_missing_row_returns_none() {
        let pool = pool();
        let conn = pool.get().unwrap();
        let result = update(
            &conn,
            "missing",
            &UserUpdate {
                country: Some("NL".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn increment_login_count_bumps_counter() {
        let pool = pool();
        let conn = pool.get().unwrap();
        insert(&conn, &alice()).unwrap();

        assert!(increment_login_count(&conn, "kp_alice").unwrap());
        assert!(increment_login_count(&conn, "kp_alice").unwrap());
        let user = find_by_kinde_id(&conn, "kp_alice").unwrap().unwrap();
        assert_eq!(user.login_count, 3);

        assert!(!increment_login_count(&conn, "kp_nobody").unwrap());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let pool = pool();
        let conn = pool.get().unwrap();
        insert(&conn, &alice()).unwrap();

        let result = insert(
            &conn,
            &NewUser {
                kinde_id: "kp_other".into(),
                email: "other@example.com".into(),
                ..alice()
            },
        );
        assert!(result.is_err());
        assert!(username_exists(&conn, "alice").unwrap());
    }
}
