use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::db::models::User;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::services::{follows, users};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/users/{username}/follow",
        get(follow_status).post(follow).delete(unfollow),
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    success: bool,
    is_following: bool,
    followers_count: i64,
    following_count: i64,
}

fn respond(state: &AppState, caller: &User, target: &User) -> AppResult<Json<FollowResponse>> {
    Ok(Json(FollowResponse {
        success: true,
        is_following: follows::is_following(&state.db, &caller.id, &target.id)?,
        followers_count: follows::get_followers_count(&state.db, &target.id)?,
        following_count: follows::get_following_count(&state.db, &target.id)?,
    }))
}

/// GET /api/users/{username}/follow
async fn follow_status(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Json<FollowResponse>> {
    let target = users::get_by_username(&state.db, &username)?;
    respond(&state, &caller, &target)
}

/// POST /api/users/{username}/follow
async fn follow(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Json<FollowResponse>> {
    let target = users::get_by_username(&state.db, &username)?;
    follows::follow_user(&state.db, &caller.id, &target.id)?;
    tracing::debug!("{} follows {}", caller.username, target.username);
    respond(&state, &caller, &target)
}

/// DELETE /api/users/{username}/follow
async fn unfollow(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Json<FollowResponse>> {
    let target = users::get_by_username(&state.db, &username)?;
    follows::unfollow_user(&state.db, &caller.id, &target.id)?;
    respond(&state, &caller, &target)
}
