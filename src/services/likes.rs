use super::{ServiceError, ServiceResult};
use crate::db::models::Like;
use crate::repository::{likes, stories};
use crate::state::DbPool;

/// Like a story. Liking twice is a no-op that returns the original like.
pub fn like_story(pool: &DbPool, user_id: &str, story_id: &str) -> ServiceResult<Like> {
    let conn = pool.get()?;
    if stories::find(&conn, story_id)?.is_none() {
        return Err(ServiceError::NotFound("Story"));
    }

    let (like, created) = likes::insert(&conn, user_id, story_id)?;
    if created {
        tracing::debug!("User {} liked story {}", user_id, story_id);
    }
    Ok(like)
}

pub fn unlike_story(pool: &DbPool, user_id: &str, story_id: &str) -> ServiceResult<()> {
    let conn = pool.get()?;
    if !likes::delete(&conn, user_id, story_id)? {
        return Err(ServiceError::NotFound("Like"));
    }
    Ok(())
}

pub fn is_liked(pool: &DbPool, user_id: &str, story_id: &str) -> ServiceResult<bool> {
    let conn = pool.get()?;
    Ok(likes::exists(&conn, user_id, story_id)?)
}

pub fn get_likes_count(pool: &DbPool, story_id: &str) -> ServiceResult<i64> {
    let conn = pool.get()?;
    Ok(likes::count_for_story(&conn, story_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewStory;
    use crate::repository::test_support::{insert_user, pool};
    use crate::services::stories::create_complete_story;

    fn setup() -> (DbPool, String) {
        let pool = pool();
        {
            let conn = pool.get().unwrap();
            insert_user(&conn, "u1", "alice");
            insert_user(&conn, "u2", "bob");
        }
        let story = create_complete_story(
            &pool,
            &NewStory {
                user_id: "u1".into(),
                title: "The Sun".into(),
                story_content: "It was warm.".into(),
                age_group: "3-5".into(),
                language: "English".into(),
                topic: "Nature".into(),
                subtopic: "Sun".into(),
                style: "Calm".into(),
                ..Default::default()
            },
        )
        .unwrap();
        (pool, story.id)
    }

    #[test]
    fn liking_twice_keeps_one_row() {
        let (pool, story_id) = setup();

        let first = like_story(&pool, "u2", &story_id).unwrap();
        assert_eq!(get_likes_count(&pool, &story_id).unwrap(), 1);

        let second = like_story(&pool, "u2", &story_id).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(get_likes_count(&pool, &story_id).unwrap(), 1);
        assert!(is_liked(&pool, "u2", &story_id).unwrap());
    }

    #[test]
    fn unlike_without_like_is_not_found() {
        let (pool, story_id) = setup();
        assert!(matches!(
            unlike_story(&pool, "u2", &story_id),
            Err(ServiceError::NotFound("Like"))
        ));
    }

    #[test]
    fn unlike_removes_the_like() {
        let (pool, story_id) = setup();
        like_story(&pool, "u1", &story_id).unwrap();
        like_story(&pool, "u2", &story_id).unwrap();

        unlike_story(&pool, "u2", &story_id).unwrap();
        assert!(!is_liked(&pool, "u2", &story_id).unwrap());
        assert_eq!(get_likes_count(&pool, &story_id).unwrap(), 1);
    }

    #[test]
    fn liking_missing_story_is_not_found() {
        let (pool, _) = setup();
        assert!(matches!(
            like_story(&pool, "u2", "missing"),
            Err(ServiceError::NotFound("Story"))
        ));
    }
}
