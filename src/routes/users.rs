use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::extractors::{AppJson, CurrentUser, MaybeUser};
use crate::mail::{self, messages};
use crate::services::users::{self, ProfileChanges, PublicProfile};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users/{username}", get(profile).delete(delete_account))
        .route("/api/users/{username}/avatar", patch(update_avatar))
        .route("/api/users/{username}/profile", patch(update_profile))
}

#[derive(Serialize)]
pub struct ProfileResponse {
    success: bool,
    profile: PublicProfile,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct DeleteAccountRequest {
    reason: Option<String>,
    feedback: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct AvatarRequest {
    #[serde(alias = "avatarStyle")]
    avatar_style: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ProfileRequest {
    country: Option<String>,
    #[serde(alias = "dateOfBirth")]
    date_of_birth: Option<String>,
}

#[derive(Serialize)]
pub struct ProfileFields {
    id: String,
    country: Option<String>,
    date_of_birth: Option<String>,
}

#[derive(Serialize)]
pub struct ProfileUpdateResponse {
    success: bool,
    user: ProfileFields,
}

/// GET /api/users/{username}
/// Public profile; `is_following` is filled in for signed-in viewers.
async fn profile(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(username): Path<String>,
) -> AppResult<Json<ProfileResponse>> {
    let profile = users::public_profile(&state.db, &username, viewer.as_ref())?;
    Ok(Json(ProfileResponse {
        success: true,
        profile,
    }))
}

/// DELETE /api/users/{username}
/// The body is optional: `{ "reason": ..., "feedback": ... }`.
async fn delete_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
    body: Bytes,
) -> AppResult<Json<serde_json::Value>> {
    let req: DeleteAccountRequest = if body.is_empty() {
        DeleteAccountRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))?
    };

    let record = users::delete_account(
        &state.db,
        &user,
        &username,
        req.reason.as_deref(),
        req.feedback.as_deref(),
    )?;

    let email = messages::account_deleted(&state.config.email, &record.username, &record.email);
    mail::send_quietly(state.mailer.as_ref(), email).await;

    Ok(Json(serde_json::json!({ "success": true })))
}

/// PATCH /api/users/{username}/avatar
async fn update_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
    AppJson(req): AppJson<AvatarRequest>,
) -> AppResult<Json<serde_json::Value>> {
    users::update_avatar(&state.db, &user, &username, &req.avatar_style)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// PATCH /api/users/{username}/profile
async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
    AppJson(req): AppJson<ProfileRequest>,
) -> AppResult<Json<ProfileUpdateResponse>> {
    let changes = ProfileChanges {
        country: req.country,
        date_of_birth: req.date_of_birth,
    };
    let updated = users::update_profile(&state.db, &user, &username, &changes)?;
    Ok(Json(ProfileUpdateResponse {
        success: true,
        user: ProfileFields {
            id: updated.id,
            country: updated.country,
            date_of_birth: updated.date_of_birth,
        },
    }))
}
