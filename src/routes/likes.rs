use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::services::{likes, stories, ServiceError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/stories/{id}/like",
        get(like_status).post(like).delete(unlike),
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    success: bool,
    is_liked: bool,
    likes_count: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggle {
    success: bool,
    liked: bool,
    likes_count: i64,
}

/// GET /api/stories/{id}/like
async fn like_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<LikeStatus>> {
    if stories::get_story_with_details(&state.db, &id)?.is_none() {
        return Err(ServiceError::NotFound("Story").into());
    }
    Ok(Json(LikeStatus {
        success: true,
        is_liked: likes::is_liked(&state.db, &user.id, &id)?,
        likes_count: likes::get_likes_count(&state.db, &id)?,
    }))
}

/// POST /api/stories/{id}/like
async fn like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<LikeToggle>> {
    likes::like_story(&state.db, &user.id, &id)?;
    Ok(Json(LikeToggle {
        success: true,
        liked: true,
        likes_count: likes::get_likes_count(&state.db, &id)?,
    }))
}

/// DELETE /api/stories/{id}/like
async fn unlike(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<LikeToggle>> {
    likes::unlike_story(&state.db, &user.id, &id)?;
    Ok(Json(LikeToggle {
        success: true,
        liked: false,
        likes_count: likes::get_likes_count(&state.db, &id)?,
    }))
}
