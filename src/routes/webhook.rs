use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::ExternalIdentity;
use crate::db::models::UserUpdate;
use crate::error::{AppError, AppResult};
use crate::services::{users, ServiceError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/kinde-webhook", post(kinde_webhook))
}

/// Claims of a Kinde webhook token.
#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct WebhookUser {
    id: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    username: Option<String>,
    is_suspended: Option<bool>,
    is_password_reset_requested: Option<bool>,
}

impl WebhookUser {
    fn identity(&self) -> ExternalIdentity {
        let text = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        ExternalIdentity {
            kinde_id: self.id.clone(),
            email: text(&self.email),
            given_name: text(&self.first_name),
            family_name: text(&self.last_name),
            preferred_username: text(&self.username),
        }
    }
}

/// POST /api/kinde-webhook
/// The body is a JWT signed with the tenant's keys.
async fn kinde_webhook(
    State(state): State<AppState>,
    body: String,
) -> AppResult<(StatusCode, Json<Value>)> {
    let claims = match state.webhook_verifier.verify(body.trim()).await {
        Ok(claims) => claims,
        Err(e) if e.is_rejection() => {
            tracing::warn!("Rejected webhook: {}", e);
            return Err(AppError::BadRequest("Invalid webhook token".into()));
        }
        Err(e) => return Err(AppError::Upstream(format!("webhook verification: {e}"))),
    };

    let event: WebhookEvent = serde_json::from_value(claims)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {e}")))?;

    match event.kind.as_str() {
        "user.created" | "user.updated" => {
            let user: WebhookUser = serde_json::from_value(event.data["user"].clone())
                .map_err(|e| AppError::BadRequest(format!("Invalid webhook user: {e}")))?;
            // A verified event is always acknowledged; one we cannot apply is skipped
            let (local, created) = match users::provision(&state.db, &user.identity()) {
                Ok(provisioned) => provisioned,
                Err(ServiceError::Validation(msg)) => {
                    tracing::warn!("Skipping webhook {} for {}: {}", event.kind, user.id, msg);
                    return Ok((StatusCode::OK, Json(json!({ "success": true }))));
                }
                Err(e) => return Err(e.into()),
            };

            let flags = UserUpdate {
                is_suspended: user.is_suspended.filter(|v| *v != local.is_suspended),
                is_password_reset_requested: user
                    .is_password_reset_requested
                    .filter(|v| *v != local.is_password_reset_requested),
                ..Default::default()
            };
            if !flags.is_empty() {
                users::update(&state.db, &local.id, &flags)?;
            }
            tracing::info!(
                "Webhook {} for {} (created: {})",
                event.kind,
                local.username,
                created
            );
        }
        other => tracing::debug!("Ignoring webhook event {}", other),
    }

    Ok((StatusCode::OK, Json(json!({ "success": true }))))
}
