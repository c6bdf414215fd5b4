use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::extractors::{AppJson, MaybeUser};
use crate::mail::messages::{self, ContactMessage, FeedbackMessage};
use crate::mail::Email;
use crate::state::AppState;

const MAX_MESSAGE_LEN: usize = 5000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/contact", post(contact))
        .route("/api/feedback", post(feedback))
}

#[derive(Serialize)]
pub struct SentResponse {
    success: bool,
    message: &'static str,
}

fn check_message(message: &str) -> AppResult<()> {
    if message.trim().is_empty() {
        return Err(AppError::BadRequest("Missing required field: message".into()));
    }
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::BadRequest(format!(
            "Message must be {MAX_MESSAGE_LEN} characters or less"
        )));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.trim().split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Unlike the welcome and goodbye notices, a contact or feedback message
/// that cannot be delivered fails the request with a 500.
async fn deliver(state: &AppState, email: Email) -> AppResult<()> {
    state
        .mailer
        .send(&email)
        .await
        .map_err(|e| AppError::Upstream(format!("mail delivery: {e}")))
}

/// POST /api/contact
async fn contact(
    State(state): State<AppState>,
    AppJson(req): AppJson<ContactMessage>,
) -> AppResult<Json<SentResponse>> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Missing required field: name".into()));
    }
    if !looks_like_email(&req.email) {
        return Err(AppError::BadRequest("A valid email address is required".into()));
    }
    check_message(&req.message)?;

    let email = messages::contact(&state.config.email, &req)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    deliver(&state, email).await?;

    Ok(Json(SentResponse {
        success: true,
        message: "Thanks for reaching out! We'll get back to you soon.",
    }))
}

/// POST /api/feedback
/// Signed-in callers are identified in the message; anyone may send.
async fn feedback(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    AppJson(req): AppJson<FeedbackMessage>,
) -> AppResult<Json<SentResponse>> {
    check_message(&req.message)?;
    if let Some(rating) = req.rating {
        if !(1..=5).contains(&rating) {
            return Err(AppError::BadRequest("Rating must be between 1 and 5".into()));
        }
    }
    if let Some(email) = req.email.as_deref().filter(|e| !e.trim().is_empty()) {
        if !looks_like_email(email) {
            return Err(AppError::BadRequest("A valid email address is required".into()));
        }
    }

    let email = messages::feedback(&state.config.email, &req, user.as_ref())
        .map_err(|e| AppError::Internal(e.to_string()))?;
    deliver(&state, email).await?;

    Ok(Json(SentResponse {
        success: true,
        message: "Thank you for your feedback!",
    }))
}
