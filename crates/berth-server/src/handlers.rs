//! Request handlers.
//!
//! Domain failures answer 412 with the endpoint's own body shape. Only a
//! coarse reason reaches the caller; the cause is logged.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use berth_common::error::BerthError;
use berth_common::request::{ActionRequest, DeleteRequest, LaunchRequest};
use serde::Serialize;
use serde_json::{Value, json};

use crate::api::AppState;
use crate::body::JsonDoc;
use crate::context::Caller;
use crate::error::{ALLOWED_METHODS, ApiError};

/// Reason returned when the caller is at the per-user limit.
pub const QUOTA_CONDITION: &str = "Per User max container limit exceeded";

fn single<T: Serialize>(status: StatusCode, key: String, value: T) -> Response {
    (status, Json(BTreeMap::from([(key, value)]))).into_response()
}

/// GET /containers: the caller's containers.
///
/// # Errors
///
/// Returns [`ApiError::Engine`] if the engine cannot be queried.
pub async fn list_containers(
    State(state): State<AppState>,
    Caller(caller): Caller,
    JsonDoc(_): JsonDoc<Value>,
) -> Result<Json<Value>, ApiError> {
    let containers = state.service.list(&caller).await?;
    Ok(Json(json!({ "Running Containers": containers })))
}

/// GET /images: images available on the host.
///
/// # Errors
///
/// Returns [`ApiError::Engine`] if the engine cannot be queried.
pub async fn list_images(
    State(state): State<AppState>,
    JsonDoc(_): JsonDoc<Value>,
) -> Result<Json<Value>, ApiError> {
    let images = state.service.images().await?;
    tracing::info!(count = images.len(), "listed images");
    Ok(Json(json!({ "Available Images": images })))
}

/// POST /containers: launch a container.
pub async fn launch_container(
    State(state): State<AppState>,
    Caller(caller): Caller,
    JsonDoc(request): JsonDoc<LaunchRequest>,
) -> Response {
    match state.service.launch(&caller, &request).await {
        Ok(info) => (StatusCode::CREATED, Json(info)).into_response(),
        Err(e) => {
            let condition = match &e {
                BerthError::QuotaExceeded { .. } => QUOTA_CONDITION,
                BerthError::PortExhausted { .. } => "No free application port available",
                _ => "Container launch failed",
            };
            tracing::error!(%caller, error = %e, "launch rejected");
            single(
                StatusCode::PRECONDITION_FAILED,
                "condition".to_string(),
                condition,
            )
        }
    }
}

/// PUT /containers: start, stop or restart a container.
pub async fn act_on_container(
    State(state): State<AppState>,
    Caller(caller): Caller,
    JsonDoc(request): JsonDoc<ActionRequest>,
) -> Response {
    let label = request.action.clone().unwrap_or_else(|| "None".to_string());
    let selector = request.target.selector();
    match state
        .service
        .act(&caller, request.action.as_deref(), selector.as_ref())
        .await
    {
        Ok(info) => single(StatusCode::OK, format!("Action {label} successful"), info),
        Err(e) => {
            tracing::debug!(%caller, action = %label, error = %e, "action failed");
            single(
                StatusCode::PRECONDITION_FAILED,
                format!("Action {label} failed"),
                format!(
                    "Invalid action or invalid container or container doesn't belong to user {caller}"
                ),
            )
        }
    }
}

/// DELETE /containers: force-remove a container.
pub async fn delete_container(
    State(state): State<AppState>,
    Caller(caller): Caller,
    JsonDoc(request): JsonDoc<DeleteRequest>,
) -> Response {
    match state
        .service
        .delete(&caller, request.target.selector().as_ref())
        .await
    {
        Ok(record) => single(
            StatusCode::OK,
            "Delete successful".to_string(),
            format!("Container name:{}, id:{}", record.name, record.short_id),
        ),
        Err(e) => {
            tracing::debug!(%caller, error = %e, "delete failed");
            single(
                StatusCode::PRECONDITION_FAILED,
                "Delete failed".to_string(),
                format!("Invalid container or doesn't belong to user {caller}"),
            )
        }
    }
}

/// OPTIONS on any resource: the methods the service answers.
#[allow(clippy::unused_async)]
pub async fn allowed_methods() -> Response {
    (StatusCode::OK, [(header::ALLOW, ALLOWED_METHODS)]).into_response()
}
