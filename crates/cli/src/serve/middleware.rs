//! API key authentication.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::state::AppState;

/// Routes reachable without a key.
const PUBLIC_PATHS: &[&str] = &["/health"];

/// Key presented by the caller: `Authorization: Bearer <key>` first, then
/// `X-API-Key: <key>`.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    bearer.or_else(|| headers.get("x-api-key").and_then(|v| v.to_str().ok()))
}

/// Reject requests without the configured API key. A no-op when no key is
/// configured.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let rejection = match presented_key(request.headers()) {
        Some(key) if key == expected => None,
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "rejected request with invalid API key");
            Some((StatusCode::FORBIDDEN, "invalid API key"))
        }
        None => Some((StatusCode::UNAUTHORIZED, "authentication required")),
    };

    match rejection {
        None => next.run(request).await,
        Some((status, message)) => super::json_error(status, message).into_response(),
    }
}
