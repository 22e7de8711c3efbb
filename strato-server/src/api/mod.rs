//! API Module
//!
//! HTTP layer for the stack deployment service. Cross-cutting concerns —
//! the auth gate, the version header, request tracing — are composed
//! explicitly here at router assembly.

use axum::{Router, http::HeaderValue, middleware, response::Response, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::tool::{ArtifactRegistry, ProvisionTool};

pub mod auth;
pub mod error;
pub mod health;
pub mod stack;

/// Header naming the service version, stamped on every response.
pub const VERSION_HEADER: &str = "x-strato-version";

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub provisioner: Arc<dyn ProvisionTool>,
    pub registry: Arc<dyn ArtifactRegistry>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let stacks = Router::new()
        .route("/stacks", get(stack::all_stacks).post(stack::create_stack))
        .route(
            "/stacks/{id}",
            get(stack::get_stack)
                .patch(stack::patch_stack)
                .delete(stack::delete_stack),
        )
        // The capability gate wraps exactly these routes.
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(stacks)
        .fallback(auth::fallback)
        .layer(middleware::map_response(stamp_version))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Every response carries the service version, success or failure.
async fn stamp_version(mut response: Response) -> Response {
    response.headers_mut().insert(
        VERSION_HEADER,
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    response
}
