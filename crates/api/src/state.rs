use std::sync::Arc;

use crate::catalog::CommandCatalog;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Registered commands with their schemas and import resolvers.
    pub catalog: Arc<CommandCatalog>,
    pub config: Arc<ServerConfig>,
}
