//! Authorization gate
//!
//! A bearer-token check composed around the stack routes at router
//! assembly. When no token is configured the gate admits all callers
//! (development mode).

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::AppState;
use crate::api::error::Problem;

/// Rejects requests that do not carry the configured bearer token.
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = &state.config.api_token else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if presented == Some(expected.as_str()) {
        next.run(request).await
    } else {
        Problem::unauthorized().into_response()
    }
}

/// Unknown paths answer 401, not 404: the set of valid routes is not
/// disclosed to unauthenticated callers.
pub async fn fallback() -> Response {
    Problem::unauthorized().into_response()
}
