use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{Author, NewStory, Story, StoryData, StoryOutput, StoryWithDetails};
use crate::db::{from_epoch, new_id, now_epoch};

const STORY_COLUMNS: &str = "id, user_id, story_data_id, story_output_id, shared, published, \
    published_at, created_at, updated_at";

const DETAILS_SELECT: &str = "
    SELECT s.id, s.story_data_id, s.story_output_id,
           d.title, o.story_content, d.age_group, d.language, d.topic, d.subtopic,
           d.style, d.first_name, d.gender,
           s.shared, s.published, s.published_at, s.created_at, s.updated_at,
           u.id, u.username, u.first_name, u.avatar_style
    FROM stories s
    JOIN stories_data d ON d.id = s.story_data_id
    JOIN stories_output o ON o.id = s.story_output_id
    JOIN users u ON u.id = s.user_id";

fn map_story(row: &Row<'_>) -> rusqlite::Result<Story> {
    let published_at: Option<i64> = row.get(6)?;
    Ok(Story {
        id: row.get(0)?,
        user_id: row.get(1)?,
        story_data_id: row.get(2)?,
        story_output_id: row.get(3)?,
        shared: row.get(4)?,
        published: row.get(5)?,
        published_at: published_at.map(from_epoch),
        created_at: from_epoch(row.get(7)?),
        updated_at: from_epoch(row.get(8)?),
    })
}

fn map_details(row: &Row<'_>) -> rusqlite::Result<StoryWithDetails> {
    let published_at: Option<i64> = row.get(14)?;
    let avatar_style: Option<String> = row.get(20)?;
    Ok(StoryWithDetails {
        id: row.get(0)?,
        story_data_id: row.get(1)?,
        story_output_id: row.get(2)?,
        title: row.get(3)?,
        story_content: row.get(4)?,
        age_group: row.get(5)?,
        language: row.get(6)?,
        topic: row.get(7)?,
        subtopic: row.get(8)?,
        style: row.get(9)?,
        first_name: row.get(10)?,
        gender: row.get(11)?,
        shared: row.get(12)?,
        published: row.get(13)?,
        published_at: published_at.map(from_epoch),
        created_at: from_epoch(row.get(15)?),
        updated_at: from_epoch(row.get(16)?),
        author: Author {
            id: row.get(17)?,
            username: row.get(18)?,
            first_name: row.get(19)?,
            avatar_style: avatar_style.and_then(|s| s.parse().ok()),
        },
    })
}

pub fn insert_data(conn: &Connection, story: &NewStory) -> rusqlite::Result<StoryData> {
    let data = StoryData {
        id: new_id(),
        user_id: story.user_id.clone(),
        title: story.title.clone(),
        age_group: story.age_group.clone(),
        language: story.language.clone(),
        topic: story.topic.clone(),
        subtopic: story.subtopic.clone(),
        style: story.style.clone(),
        first_name: story.first_name.clone(),
        gender: story.gender.clone(),
        created_at: from_epoch(now_epoch()),
    };
    conn.execute(
        "INSERT INTO stories_data (id, user_id, title, age_group, language, topic, subtopic,
                                   style, first_name, gender, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            data.id,
            data.user_id,
            data.title,
            data.age_group,
            data.language,
            data.topic,
            data.subtopic,
            data.style,
            data.first_name,
            data.gender,
            data.created_at.timestamp()
        ],
    )?;
    Ok(data)
}

pub fn insert_output(
    conn: &Connection,
    story_data_id: &str,
    story_content: &str,
) -> rusqlite::Result<StoryOutput> {
    let output = StoryOutput {
        id: new_id(),
        story_data_id: story_data_id.to_string(),
        story_content: story_content.to_string(),
        created_at: from_epoch(now_epoch()),
    };
    conn.execute(
        "INSERT INTO stories_output (id, story_data_id, story_content, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            output.id,
            output.story_data_id,
            output.story_content,
            output.created_at.timestamp()
        ],
    )?;
    Ok(output)
}

pub fn insert_story(
    conn: &Connection,
    user_id: &str,
    story_data_id: &str,
    story_output_id: &str,
    shared: bool,
    published: bool,
) -> rusqlite::Result<Story> {
    let now = now_epoch();
    let story = Story {
        id: new_id(),
        user_id: user_id.to_string(),
        story_data_id: story_data_id.to_string(),
        story_output_id: story_output_id.to_string(),
        shared,
        published,
        published_at: published.then(|| from_epoch(now)),
        created_at: from_epoch(now),
        updated_at: from_epoch(now),
    };
    conn.execute(
        "INSERT INTO stories (id, user_id, story_data_id, story_output_id, shared, published,
                              published_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            story.id,
            story.user_id,
            story.story_data_id,
            story.story_output_id,
            story.shared,
            story.published,
            story.published_at.map(|t| t.timestamp()),
            now
        ],
    )?;
    Ok(story)
}

pub fn find(conn: &Connection, id: &str) -> rusqlite::Result<Option<Story>> {
    let sql = format!("SELECT {STORY_COLUMNS} FROM stories WHERE id = ?1");
    conn.query_row(&sql, params![id], map_story).optional()
}

pub fn find_with_details(conn: &Connection, id: &str) -> rusqlite::Result<Option<StoryWithDetails>> {
    let sql = format!("{DETAILS_SELECT} WHERE s.id = ?1");
    conn.query_row(&sql, params![id], map_details).optional()
}

pub fn list_with_details_by_user(
    conn: &Connection,
    user_id: &str,
) -> rusqlite::Result<Vec<StoryWithDetails>> {
    let sql = format!("{DETAILS_SELECT} WHERE s.user_id = ?1 ORDER BY s.created_at DESC, s.id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id], map_details)?;
    rows.collect()
}

pub fn list_shared_by_user(
    conn: &Connection,
    user_id: &str,
) -> rusqlite::Result<Vec<StoryWithDetails>> {
    let sql = format!(
        "{DETAILS_SELECT} WHERE s.user_id = ?1 AND s.shared = 1 ORDER BY s.created_at DESC, s.id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id], map_details)?;
    rows.collect()
}

/// Id of a story owned by `user_id` with exactly this title and text.
pub fn find_duplicate(
    conn: &Connection,
    user_id: &str,
    title: &str,
    story_content: &str,
) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT s.id FROM stories s
         JOIN stories_data d ON d.id = s.story_data_id
         JOIN stories_output o ON o.id = s.story_output_id
         WHERE s.user_id = ?1 AND d.title = ?2 AND o.story_content = ?3
         LIMIT 1",
        params![user_id, title, story_content],
        |row| row.get(0),
    )
    .optional()
}

pub fn update_visibility(
    conn: &Connection,
    id: &str,
    shared: bool,
    published: bool,
    published_at: Option<i64>,
) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE stories SET shared = ?2, published = ?3, published_at = ?4, updated_at = ?5
         WHERE id = ?1",
        params![id, shared, published, published_at, now_epoch()],
    )?;
    Ok(rows > 0)
}

/// Removing the config row cascades to the output and story rows.
pub fn delete_aggregate(conn: &Connection, story: &Story) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "DELETE FROM stories_data WHERE id = ?1",
        params![story.story_data_id],
    )?;
    Ok(rows > 0)
}
