//! Handlers for command submission and discovery.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use provision_core::import::CommandContext;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/commands
///
/// List every registered command with its entity kind, natural key and
/// attribute checks.
pub async fn list_commands(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(DataResponse {
        data: state.catalog.describe(),
    }))
}

/// POST /api/v1/commands/{command}
///
/// Validate the JSON object body against the command's schema, then apply
/// it idempotently. Responds `202 Accepted` with the created or matched
/// entity; a divergent resubmission is a `409`.
pub async fn run_command(
    State(state): State<AppState>,
    Path(command): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let definition = state
        .catalog
        .get(&command)
        .ok_or_else(|| AppError::UnknownCommand(command.clone()))?;

    let Json(body) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let Value::Object(payload) = body else {
        return Err(AppError::BadRequest(
            "command body must be a JSON object".to_string(),
        ));
    };

    if let Err(err) = definition.schema.validate(&payload).await {
        tracing::info!(command = %command, error = %err, "Command rejected");
        return Err(err.into());
    }

    let context = CommandContext::new(command.clone(), payload.clone());
    let imported = definition.resolver.import(&payload, &context).await?;

    tracing::info!(
        command = %command,
        entity_id = imported.entity.id,
        outcome = ?imported.outcome,
        "Command applied"
    );

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: imported })))
}
