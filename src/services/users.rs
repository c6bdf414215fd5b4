use chrono::{NaiveDate, Utc};
use rand::Rng;
use rusqlite::Connection;
use serde::Serialize;

use super::{is_unique_violation, require, ServiceError, ServiceResult};
use crate::auth::ExternalIdentity;
use crate::db::models::{
    AvatarStyle, DeletedAccount, NewUser, StoryWithDetails, UnknownAvatarStyle, User, UserUpdate,
};
use crate::repository::{deleted_accounts, follows, stories, users};
use crate::state::DbPool;

const MAX_USERNAME_LEN: usize = 20;
const MAX_COUNTRY_LEN: usize = 56;

pub fn create_user(pool: &DbPool, input: &NewUser) -> ServiceResult<User> {
    let conn = pool.get()?;
    insert_user(&conn, input)
}

fn insert_user(conn: &Connection, input: &NewUser) -> ServiceResult<User> {
    require("kinde_id", &input.kinde_id)?;
    require("email", &input.email)?;
    require("username", &input.username)?;

    users::insert(conn, input).map_err(|e| {
        if is_unique_violation(&e) {
            ServiceError::Conflict("A user with this identity, email or username already exists".into())
        } else {
            e.into()
        }
    })
}

pub fn find_by_kinde_id(pool: &DbPool, kinde_id: &str) -> ServiceResult<Option<User>> {
    let conn = pool.get()?;
    Ok(users::find_by_kinde_id(&conn, kinde_id)?)
}

pub fn get_by_kinde_id(pool: &DbPool, kinde_id: &str) -> ServiceResult<User> {
    find_by_kinde_id(pool, kinde_id)?.ok_or(ServiceError::NotFound("User"))
}

pub fn get_by_username(pool: &DbPool, username: &str) -> ServiceResult<User> {
    let conn = pool.get()?;
    users::find_by_username(&conn, username)?.ok_or(ServiceError::NotFound("User"))
}

pub fn get_by_email(pool: &DbPool, email: &str) -> ServiceResult<User> {
    let conn = pool.get()?;
    users::find_by_email(&conn, email)?.ok_or(ServiceError::NotFound("User"))
}

pub fn get_by_id(pool: &DbPool, id: &str) -> ServiceResult<User> {
    let conn = pool.get()?;
    users::find_by_id(&conn, id)?.ok_or(ServiceError::NotFound("User"))
}

/// Apply a partial update. `updated_at` is stamped; `created_at` is left alone.
pub fn update(pool: &DbPool, id: &str, changes: &UserUpdate) -> ServiceResult<User> {
    let conn = pool.get()?;
    apply_update(&conn, id, changes)
}

fn apply_update(conn: &Connection, id: &str, changes: &UserUpdate) -> ServiceResult<User> {
    users::update(conn, id, changes)
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::Conflict("Email or username already in use".into())
            } else {
                e.into()
            }
        })?
        .ok_or(ServiceError::NotFound("User"))
}

pub fn increment_login_count(pool: &DbPool, kinde_id: &str) -> ServiceResult<User> {
    let conn = pool.get()?;
    if !users::increment_login_count(&conn, kinde_id)? {
        return Err(ServiceError::NotFound("User"));
    }
    users::find_by_kinde_id(&conn, kinde_id)?.ok_or(ServiceError::NotFound("User"))
}

/// Make sure a user row exists for this identity, refreshing the profile
/// fields the provider owns. Returns the row and whether it was created.
pub fn provision(pool: &DbPool, identity: &ExternalIdentity) -> ServiceResult<(User, bool)> {
    require("kinde_id", &identity.kinde_id)?;
    let conn = pool.get()?;

    if let Some(existing) = users::find_by_kinde_id(&conn, &identity.kinde_id)? {
        let changes = profile_changes(&existing, identity);
        if changes.is_empty() {
            return Ok((existing, false));
        }
        tracing::info!("Refreshing profile for {}", existing.username);
        return Ok((apply_update(&conn, &existing.id, &changes)?, false));
    }

    let email = identity
        .email
        .clone()
        .ok_or_else(|| ServiceError::Validation("Identity has no email address".into()))?;
    let input = NewUser {
        kinde_id: identity.kinde_id.clone(),
        username: unique_username(&conn, identity)?,
        email,
        first_name: identity.given_name.clone(),
        last_name: identity.family_name.clone(),
    };

    match insert_user(&conn, &input) {
        Ok(user) => {
            tracing::info!("Provisioned user {} for {}", user.username, user.kinde_id);
            Ok((user, true))
        }
        // Lost a race with a concurrent login or webhook for the same identity
        Err(ServiceError::Conflict(msg)) => users::find_by_kinde_id(&conn, &identity.kinde_id)?
            .map(|user| (user, false))
            .ok_or(ServiceError::Conflict(msg)),
        Err(e) => Err(e),
    }
}

/// Login-time sync: first sight creates the user with `login_count = 1`,
/// every later login bumps the counter.
pub fn record_login(pool: &DbPool, identity: &ExternalIdentity) -> ServiceResult<(User, bool)> {
    let (user, created) = provision(pool, identity)?;
    if created {
        return Ok((user, true));
    }
    Ok((increment_login_count(pool, &user.kinde_id)?, false))
}

fn profile_changes(user: &User, identity: &ExternalIdentity) -> UserUpdate {
    let changed = |current: &Option<String>, incoming: &Option<String>| match incoming {
        Some(value) if current.as_ref() != Some(value) => Some(value.clone()),
        _ => None,
    };

    UserUpdate {
        email: identity
            .email
            .as_ref()
            .filter(|email| **email != user.email)
            .cloned(),
        first_name: changed(&user.first_name, &identity.given_name),
        last_name: changed(&user.last_name, &identity.family_name),
        ..Default::default()
    }
}

/// Lowercase ASCII letters, digits and underscores, capped in length.
pub fn normalize_username(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            'a'..='z' | '0'..='9' | '_' => Some(c),
            'A'..='Z' => Some(c.to_ascii_lowercase()),
            '.' | '-' | ' ' => Some('_'),
            _ => None,
        })
        .collect::<String>()
        .trim_matches('_')
        .chars()
        .take(MAX_USERNAME_LEN)
        .collect()
}

fn unique_username(conn: &Connection, identity: &ExternalIdentity) -> ServiceResult<String> {
    let candidates = [
        identity.preferred_username.as_deref(),
        identity
            .email
            .as_deref()
            .and_then(|email| email.split('@').next()),
        identity.given_name.as_deref(),
    ];
    let base = candidates
        .into_iter()
        .flatten()
        .map(normalize_username)
        .find(|name| name.len() >= 3)
        .unwrap_or_else(|| "reader".to_string());

    if !users::username_exists(conn, &base)? {
        return Ok(base);
    }

    let mut rng = rand::thread_rng();
    let stem: String = base.chars().take(MAX_USERNAME_LEN - 5).collect();
    for _ in 0..10 {
        let candidate = format!("{stem}_{:04}", rng.gen_range(0..10_000));
        if !users::username_exists(conn, &candidate)? {
            return Ok(candidate);
        }
    }
    Err(ServiceError::Conflict(
        "Could not allocate a unique username".into(),
    ))
}

fn require_owner(conn: &Connection, caller: &User, username: &str) -> ServiceResult<User> {
    let target = users::find_by_username(conn, username)?.ok_or(ServiceError::NotFound("User"))?;
    if target.id != caller.id {
        return Err(ServiceError::Forbidden(
            "You can only change your own account".into(),
        ));
    }
    Ok(target)
}

pub fn update_avatar(
    pool: &DbPool,
    caller: &User,
    username: &str,
    style: &str,
) -> ServiceResult<User> {
    let style: AvatarStyle = style
        .parse()
        .map_err(|e: UnknownAvatarStyle| ServiceError::Validation(e.to_string()))?;

    let conn = pool.get()?;
    let target = require_owner(&conn, caller, username)?;
    apply_update(
        &conn,
        &target.id,
        &UserUpdate {
            avatar_style: Some(style),
            ..Default::default()
        },
    )
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub country: Option<String>,
    pub date_of_birth: Option<String>,
}

pub fn update_profile(
    pool: &DbPool,
    caller: &User,
    username: &str,
    changes: &ProfileChanges,
) -> ServiceResult<User> {
    let country = changes
        .country
        .as_deref()
        .map(validate_country)
        .transpose()?;
    let date_of_birth = changes
        .date_of_birth
        .as_deref()
        .map(validate_date_of_birth)
        .transpose()?;
    if country.is_none() && date_of_birth.is_none() {
        return Err(ServiceError::Validation("Nothing to update".into()));
    }

    let conn = pool.get()?;
    let target = require_owner(&conn, caller, username)?;
    apply_update(
        &conn,
        &target.id,
        &UserUpdate {
            country,
            date_of_birth,
            ..Default::default()
        },
    )
}

fn validate_country(raw: &str) -> ServiceResult<String> {
    let country = raw.trim();
    if country.is_empty() || country.chars().count() > MAX_COUNTRY_LEN {
        return Err(ServiceError::Validation("Invalid country".into()));
    }
    Ok(country.to_string())
}

fn validate_date_of_birth(raw: &str) -> ServiceResult<String> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ServiceError::Validation("Date of birth must be YYYY-MM-DD".into()))?;
    if date > Utc::now().date_naive() {
        return Err(ServiceError::Validation(
            "Date of birth cannot be in the future".into(),
        ));
    }
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Remove the caller's account. The audit record and the delete share one
/// transaction; stories, likes and follows go with the user row.
pub fn delete_account(
    pool: &DbPool,
    caller: &User,
    username: &str,
    reason: Option<&str>,
    feedback: Option<&str>,
) -> ServiceResult<DeletedAccount> {
    let mut conn = pool.get()?;
    let target = require_owner(&conn, caller, username)?;

    let tx = conn.transaction()?;
    let record = deleted_accounts::insert(&tx, &target.username, &target.email, reason, feedback)?;
    users::delete(&tx, &target.id)?;
    tx.commit()?;

    tracing::info!("Deleted account {}", target.username);
    Ok(record)
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub id: String,
    pub username: String,
    pub first_name: Option<String>,
    pub avatar_style: Option<AvatarStyle>,
    pub user_since: chrono::DateTime<Utc>,
    pub followers_count: i64,
    pub following_count: i64,
    pub is_following: bool,
    pub is_self: bool,
    pub stories: Vec<StoryWithDetails>,
}

pub fn public_profile(
    pool: &DbPool,
    username: &str,
    viewer: Option<&User>,
) -> ServiceResult<PublicProfile> {
    let conn = pool.get()?;
    let user = users::find_by_username(&conn, username)?.ok_or(ServiceError::NotFound("User"))?;

    let is_following = match viewer {
        Some(v) if v.id != user.id => follows::exists(&conn, &v.id, &user.id)?,
        _ => false,
    };

    Ok(PublicProfile {
        followers_count: follows::followers_count(&conn, &user.id)?,
        following_count: follows::following_count(&conn, &user.id)?,
        stories: stories::list_shared_by_user(&conn, &user.id)?,
        is_following,
        is_self: viewer.is_some_and(|v| v.id == user.id),
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        avatar_style: user.avatar_style,
        user_since: user.user_since,
    })
}
