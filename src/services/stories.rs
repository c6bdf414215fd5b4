use super::{require, ServiceError, ServiceResult};
use crate::db::models::{NewStory, Story, StoryWithDetails};
use crate::db::now_epoch;
use crate::repository::stories;
use crate::state::DbPool;
use crate::writer::{StoryDraft, StoryPrompt, StoryWriter, WriterError};

const MAX_TITLE_LEN: usize = 200;

fn validate_new_story(story: &NewStory) -> ServiceResult<()> {
    require("user_id", &story.user_id)?;
    require("title", &story.title)?;
    require("story_content", &story.story_content)?;
    require("age_group", &story.age_group)?;
    require("language", &story.language)?;
    require("topic", &story.topic)?;
    require("subtopic", &story.subtopic)?;
    require("style", &story.style)?;
    if story.title.chars().count() > MAX_TITLE_LEN {
        return Err(ServiceError::Validation(format!(
            "Title must be {MAX_TITLE_LEN} characters or less"
        )));
    }
    Ok(())
}

/// Write StoryData, StoryOutput and Story in one transaction. Nothing is left
/// behind if any of the three inserts fails.
pub fn create_complete_story(pool: &DbPool, input: &NewStory) -> ServiceResult<Story> {
    validate_new_story(input)?;

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    let data = stories::insert_data(&tx, input)?;
    let output = stories::insert_output(&tx, &data.id, &input.story_content)?;
    let story = stories::insert_story(
        &tx,
        &input.user_id,
        &data.id,
        &output.id,
        input.shared,
        input.published,
    )?;
    tx.commit()?;

    tracing::info!("Created story {} for user {}", story.id, story.user_id);
    Ok(story)
}

pub fn get_story_with_details(pool: &DbPool, id: &str) -> ServiceResult<Option<StoryWithDetails>> {
    let conn = pool.get()?;
    Ok(stories::find_with_details(&conn, id)?)
}

pub fn get_stories_by_user_id_with_details(
    pool: &DbPool,
    user_id: &str,
) -> ServiceResult<Vec<StoryWithDetails>> {
    let conn = pool.get()?;
    Ok(stories::list_with_details_by_user(&conn, user_id)?)
}

/// The owner's view of one of their stories.
pub fn get_owned_story(pool: &DbPool, caller_id: &str, id: &str) -> ServiceResult<StoryWithDetails> {
    let story = get_story_with_details(pool, id)?.ok_or(ServiceError::NotFound("Story"))?;
    if story.author.id != caller_id {
        return Err(ServiceError::Forbidden(
            "You do not have access to this story".into(),
        ));
    }
    Ok(story)
}

/// Anyone may read a story once its owner has shared it.
pub fn get_public_story(pool: &DbPool, id: &str) -> ServiceResult<StoryWithDetails> {
    let story = get_story_with_details(pool, id)?.ok_or(ServiceError::NotFound("Story"))?;
    if !story.shared {
        return Err(ServiceError::Forbidden("This story is not shared".into()));
    }
    Ok(story)
}

/// Copy a shared story into the caller's collection. The copy is a new,
/// independent aggregate; duplicates are detected by title and text.
pub fn save_shared_story(pool: &DbPool, caller_id: &str, source_id: &str) -> ServiceResult<Story> {
    let source = get_public_story(pool, source_id)?;

    {
        let conn = pool.get()?;
        let duplicate =
            stories::find_duplicate(&conn, caller_id, &source.title, &source.story_content)?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(
                "You have already saved this story".into(),
            ));
        }
    }

    create_complete_story(
        pool,
        &NewStory {
            user_id: caller_id.to_string(),
            title: source.title,
            story_content: source.story_content,
            age_group: source.age_group,
            language: source.language,
            topic: source.topic,
            subtopic: source.subtopic,
            style: source.style,
            first_name: source.first_name,
            gender: source.gender,
            shared: false,
            published: false,
        },
    )
}

#[derive(Debug, Clone, Default)]
pub struct VisibilityChange {
    pub shared: Option<bool>,
    pub published: Option<bool>,
}

/// Flip the owner-controlled flags. `published_at` follows `published`.
pub fn set_visibility(
    pool: &DbPool,
    caller_id: &str,
    id: &str,
    change: &VisibilityChange,
) -> ServiceResult<StoryWithDetails> {
    if change.shared.is_none() && change.published.is_none() {
        return Err(ServiceError::Validation("Nothing to update".into()));
    }

    let conn = pool.get()?;
    let story = stories::find(&conn, id)?.ok_or(ServiceError::NotFound("Story"))?;
    if story.user_id != caller_id {
        return Err(ServiceError::Forbidden(
            "Only the owner can change this story".into(),
        ));
    }

    let shared = change.shared.unwrap_or(story.shared);
    let published = change.published.unwrap_or(story.published);
    let published_at = match (story.published, published) {
        (false, true) => Some(now_epoch()),
        (true, true) => story.published_at.map(|t| t.timestamp()),
        (_, false) => None,
    };

    stories::update_visibility(&conn, id, shared, published, published_at)?;
    stories::find_with_details(&conn, id)?.ok_or(ServiceError::NotFound("Story"))
}

pub fn delete_story(pool: &DbPool, caller_id: &str, id: &str) -> ServiceResult<()> {
    let mut conn = pool.get()?;
    let story = stories::find(&conn, id)?.ok_or(ServiceError::NotFound("Story"))?;
    if story.user_id != caller_id {
        return Err(ServiceError::Forbidden(
            "Only the owner can delete this story".into(),
        ));
    }

    let tx = conn.transaction()?;
    stories::delete_aggregate(&tx, &story)?;
    tx.commit()?;

    tracing::info!("Deleted story {}", id);
    Ok(())
}

/// Ask the writer for a new story. Nothing is persisted; the reader saves the
/// draft separately if they like it.
pub async fn generate(writer: &dyn StoryWriter, prompt: &StoryPrompt) -> ServiceResult<StoryDraft> {
    require("age_group", &prompt.age_group)?;
    require("language", &prompt.language)?;
    require("topic", &prompt.topic)?;
    require("subtopic", &prompt.subtopic)?;
    require("style", &prompt.style)?;

    writer.write(prompt).await.map_err(|e| match e {
        WriterError::NotConfigured => ServiceError::Upstream("story writer is not configured".into()),
        other => ServiceError::Upstream(format!("story generation failed: {other}")),
    })
}
