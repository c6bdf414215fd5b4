use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::Json;

use crate::auth::ExternalIdentity;
use crate::db::models::User;
use crate::error::AppError;
use crate::services;
use crate::state::AppState;

/// The caller's identity as vouched for by the identity provider.
/// Returns 401 if no valid session token is present.
#[derive(Debug, Clone)]
pub struct Session(pub ExternalIdentity);

impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match MaybeSession::from_request_parts(parts, state).await? {
            MaybeSession(Some(identity)) => Ok(Session(identity)),
            MaybeSession(None) => Err(AppError::Unauthorized),
        }
    }
}

/// Optional session: `None` instead of 401 when unauthenticated.
pub struct MaybeSession(pub Option<ExternalIdentity>);

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state
            .identity
            .resolve(&parts.headers)
            .await
            .map(MaybeSession)
            .map_err(|e| AppError::Upstream(format!("identity provider: {e}")))
    }
}

/// An authenticated caller with a row in `users`. 401 without a session,
/// 404 when the session has not been synced to a local user yet.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Session(identity) = Session::from_request_parts(parts, state).await?;
        let user = services::users::get_by_kinde_id(&state.db, &identity.kinde_id)?;
        Ok(CurrentUser(user))
    }
}

/// Optional local user for endpoints that personalize when they can.
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeSession(identity) = MaybeSession::from_request_parts(parts, state).await?;
        let Some(identity) = identity else {
            return Ok(MaybeUser(None));
        };

        let user = services::users::find_by_kinde_id(&state.db, &identity.kinde_id)?;
        Ok(MaybeUser(user))
    }
}

/// `Json<T>` whose rejections use the API's error body instead of axum's
/// plain-text response. Every malformed body is a 400.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
        }
    }
}
