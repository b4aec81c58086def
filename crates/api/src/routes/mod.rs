pub mod commands;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /commands               list (GET)
/// /commands/{command}     submit (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/commands", commands::router())
}
