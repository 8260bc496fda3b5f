//! API endpoints.

mod auth;
mod forms;
mod health;
mod questions;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router. The server mounts it under `/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/forms", forms::router())
        .nest("/forms/{form_id}/questions", questions::router())
        .merge(health::router())
}
