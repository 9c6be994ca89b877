//! Router construction.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use berth_runtime::service::ContainerService;
use tower_http::trace::TraceLayer;

use crate::{context, guard, handlers};

/// Application state shared with handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Caller-scoped container operations.
    pub service: Arc<ContainerService>,
    /// Reject requests without a `username` header.
    pub require_username: bool,
}

/// Creates the router: containers on `/` and `/containers`, images on `/images`.
#[must_use]
pub fn create_router(state: AppState) -> Router {
    let containers = get(handlers::list_containers)
        .post(handlers::launch_container)
        .put(handlers::act_on_container)
        .delete(handlers::delete_container)
        .options(handlers::allowed_methods);

    Router::new()
        .route("/", containers.clone())
        .route("/containers", containers)
        .route(
            "/images",
            get(handlers::list_images).options(handlers::allowed_methods),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_json,
        ))
        .layer(middleware::from_fn(context::request_context))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
