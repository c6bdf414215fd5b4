use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::models::{NewStory, StoryWithDetails};
use crate::error::{AppError, AppResult};
use crate::extractors::{AppJson, CurrentUser};
use crate::services::stories::{self, VisibilityChange};
use crate::state::AppState;
use crate::writer::{StoryDraft, StoryPrompt};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stories", get(list_stories))
        .route("/api/stories/save", post(save_story))
        .route("/api/stories/generate", post(generate_story))
        .route(
            "/api/stories/{id}",
            get(get_story).patch(update_story).delete(delete_story),
        )
        .route("/api/stories/{id}/public", get(public_story))
        .route("/api/stories/{id}/save", post(save_shared_story))
}

#[derive(Serialize)]
pub struct StoriesResponse {
    success: bool,
    stories: Vec<StoryWithDetails>,
}

#[derive(Serialize)]
pub struct StoryResponse {
    success: bool,
    story: StoryWithDetails,
}

#[derive(Serialize)]
pub struct DraftResponse {
    success: bool,
    story: StoryDraft,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct VisibilityRequest {
    shared: Option<bool>,
    published: Option<bool>,
}

fn story_response(story: StoryWithDetails) -> Json<StoryResponse> {
    Json(StoryResponse {
        success: true,
        story,
    })
}

/// Re-read a freshly written story with its joins.
fn load_details(state: &AppState, id: &str) -> AppResult<StoryWithDetails> {
    stories::get_story_with_details(&state.db, id)?
        .ok_or_else(|| AppError::Internal(format!("story {id} vanished after insert")))
}

/// GET /api/stories
/// The caller's own stories, newest first.
async fn list_stories(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<StoriesResponse>> {
    let stories = stories::get_stories_by_user_id_with_details(&state.db, &user.id)?;
    Ok(Json(StoriesResponse {
        success: true,
        stories,
    }))
}

/// POST /api/stories/save
async fn save_story(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(mut req): AppJson<NewStory>,
) -> AppResult<(StatusCode, Json<StoryResponse>)> {
    // Ownership always comes from the session, never the body
    req.user_id = user.id;
    let story = stories::create_complete_story(&state.db, &req)?;
    Ok((StatusCode::CREATED, story_response(load_details(&state, &story.id)?)))
}

/// POST /api/stories/generate
/// Returns a draft only; saving is a separate call.
async fn generate_story(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(prompt): AppJson<StoryPrompt>,
) -> AppResult<Json<DraftResponse>> {
    tracing::info!("Generating story for {} ({})", user.username, prompt.topic);
    let story = stories::generate(state.writer.as_ref(), &prompt).await?;
    Ok(Json(DraftResponse {
        success: true,
        story,
    }))
}

/// GET /api/stories/{id}
async fn get_story(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<StoryResponse>> {
    let story = stories::get_owned_story(&state.db, &user.id, &id)?;
    Ok(story_response(story))
}

/// PATCH /api/stories/{id}
async fn update_story(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<VisibilityRequest>,
) -> AppResult<Json<StoryResponse>> {
    let change = VisibilityChange {
        shared: req.shared,
        published: req.published,
    };
    let story = stories::set_visibility(&state.db, &user.id, &id, &change)?;
    Ok(story_response(story))
}

/// DELETE /api/stories/{id}
async fn delete_story(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    stories::delete_story(&state.db, &user.id, &id)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// GET /api/stories/{id}/public
/// Readable by anyone once shared.
async fn public_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<StoryResponse>> {
    let story = stories::get_public_story(&state.db, &id)?;
    Ok(story_response(story))
}

/// POST /api/stories/{id}/save
/// Copy someone's shared story into the caller's collection.
async fn save_shared_story(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<StoryResponse>)> {
    let copy = stories::save_shared_story(&state.db, &user.id, &id)?;
    tracing::info!("{} saved a copy of story {}", user.username, id);
    Ok((StatusCode::CREATED, story_response(load_details(&state, &copy.id)?)))
}
