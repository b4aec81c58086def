use axum::routing::{get, post};
use axum::Router;

use crate::handlers::commands;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(commands::list_commands))
        .route("/{command}", post(commands::run_command))
}
