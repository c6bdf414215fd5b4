pub mod auth;
pub mod contact;
pub mod follows;
pub mod health;
pub mod likes;
pub mod stories;
pub mod users;
pub mod webhook;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full HTTP surface, ready to serve.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(stories::router())
        .merge(likes::router())
        .merge(users::router())
        .merge(follows::router())
        .merge(webhook::router())
        .merge(contact::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
