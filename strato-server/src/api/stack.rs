//! Stack API Handlers
//!
//! HTTP endpoints for the stack lifecycle.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use strato_core::domain::stack::Stack;
use strato_core::dto::stack::{CreateStack, PatchStack};

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::stack_service;

/// GET /stacks
/// List all stacks, ordered by ascending creation time
pub async fn all_stacks(State(state): State<AppState>) -> ApiResult<Json<Vec<Stack>>> {
    tracing::debug!("Listing all stacks");

    let stacks = stack_service::all_stacks(state.provisioner.as_ref())?;
    Ok(Json(stacks))
}

/// POST /stacks
/// Create a new stack
pub async fn create_stack(
    State(state): State<AppState>,
    Json(request): Json<CreateStack>,
) -> ApiResult<(StatusCode, Json<Stack>)> {
    tracing::info!("Creating stack version {}", request.stack_version);

    let stack = stack_service::create_stack(
        state.provisioner.as_ref(),
        state.registry.as_ref(),
        request,
    )?;
    Ok((StatusCode::CREATED, Json(stack)))
}

/// GET /stacks/{id}
/// Get stack by composite identifier
pub async fn get_stack(
    State(state): State<AppState>,
    Path(stack_id): Path<String>,
) -> ApiResult<Json<Stack>> {
    tracing::debug!("Getting stack: {}", stack_id);

    let stack = stack_service::get_stack(state.provisioner.as_ref(), &stack_id)?;
    Ok(Json(stack))
}

/// PATCH /stacks/{id}
/// Update traffic and machine image
///
/// Accepted, not guaranteed complete: the platform applies the change
/// asynchronously and the returned body is its current view.
pub async fn patch_stack(
    State(state): State<AppState>,
    Path(stack_id): Path<String>,
    Json(patch): Json<PatchStack>,
) -> ApiResult<(StatusCode, Json<Stack>)> {
    tracing::info!("Patching stack: {}", stack_id);

    let stack = stack_service::patch_stack(state.provisioner.as_ref(), &stack_id, patch)?;
    Ok((StatusCode::ACCEPTED, Json(stack)))
}

/// DELETE /stacks/{id}
/// Delete a stack
pub async fn delete_stack(
    State(state): State<AppState>,
    Path(stack_id): Path<String>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting stack: {}", stack_id);

    stack_service::delete_stack(state.provisioner.as_ref(), &stack_id)?;
    Ok(StatusCode::NO_CONTENT)
}
