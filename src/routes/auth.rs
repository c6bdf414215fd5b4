use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use crate::db::models::User;
use crate::error::AppResult;
use crate::extractors::Session;
use crate::mail::{self, messages};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/auth/sync", post(sync))
}

#[derive(Serialize)]
struct SyncResponse {
    success: bool,
    user: User,
    created: bool,
}

/// POST /api/auth/sync
/// Called by the frontend after every sign-in. Creates the local user on
/// first sight, otherwise bumps the login counter.
async fn sync(State(state): State<AppState>, Session(identity): Session) -> AppResult<Json<SyncResponse>> {
    let (user, created) = services::users::record_login(&state.db, &identity)?;

    if created {
        let email = messages::welcome(&state.config.email, &user);
        mail::send_quietly(state.mailer.as_ref(), email).await;
    }

    Ok(Json(SyncResponse {
        success: true,
        user,
        created,
    }))
}
