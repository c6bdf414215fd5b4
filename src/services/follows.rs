use super::{is_check_violation, ServiceError, ServiceResult};
use crate::db::models::Follow;
use crate::repository::{follows, users};
use crate::state::DbPool;

/// Follow another user. Following twice returns the existing relationship.
pub fn follow_user(pool: &DbPool, follower_id: &str, following_id: &str) -> ServiceResult<Follow> {
    if follower_id == following_id {
        return Err(ServiceError::SelfFollow);
    }

    let conn = pool.get()?;
    let target = users::find_by_id(&conn, following_id)?.ok_or(ServiceError::NotFound("User"))?;
    if target.is_suspended {
        return Err(ServiceError::Forbidden(
            "This account cannot be followed".into(),
        ));
    }

    let (follow, _) = follows::insert(&conn, follower_id, following_id).map_err(|e| {
        if is_check_violation(&e) {
            ServiceError::SelfFollow
        } else {
            e.into()
        }
    })?;
    Ok(follow)
}

pub fn unfollow_user(pool: &DbPool, follower_id: &str, following_id: &str) -> ServiceResult<()> {
    let conn = pool.get()?;
    if !follows::delete(&conn, follower_id, following_id)? {
        return Err(ServiceError::NotFound("Follow"));
    }
    Ok(())
}

pub fn is_following(pool: &DbPool, follower_id: &str, following_id: &str) -> ServiceResult<bool> {
    let conn = pool.get()?;
    Ok(follows::exists(&conn, follower_id, following_id)?)
}

pub fn get_followers_count(pool: &DbPool, user_id: &str) -> ServiceResult<i64> {
    let conn = pool.get()?;
    Ok(follows::followers_count(&conn, user_id)?)
}

pub fn get_following_count(pool: &DbPool, user_id: &str) -> ServiceResult<i64> {
    let conn = pool.get()?;
    Ok(follows::following_count(&conn, user_id)?)
}
