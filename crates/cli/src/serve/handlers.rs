//! Route handlers: health, events, records, acknowledgments.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use pdr_core::ReconcileError;
use pdr_message::WorkflowMessage;
use pdr_storage::{ManifestStore, StorageError};
use serde::Deserialize;
use time::OffsetDateTime;

use super::json_error;
use super::state::AppState;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

fn store_error(e: StorageError) -> Response {
    match e {
        StorageError::NotFound { manifest_id } => json_error(
            StatusCode::NOT_FOUND,
            &format!("PDR '{}' not found", manifest_id),
        )
        .into_response(),
        other => {
            tracing::error!(error = %other, "store request failed");
            json_error(StatusCode::SERVICE_UNAVAILABLE, &other.to_string()).into_response()
        }
    }
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// POST /events
///
/// The body is parsed here rather than through the `Json` extractor so that
/// any body that is not a workflow message maps to 400, independent of
/// content type.
pub(crate) async fn handle_post_event(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let message: WorkflowMessage = match serde_json::from_slice(&body) {
        Ok(m) => m,
        Err(e) => {
            return json_error(
                StatusCode::BAD_REQUEST,
                &format!("invalid workflow message: {}", e),
            )
            .into_response()
        }
    };

    match state.reconciler.project_and_reconcile(&message).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(ReconcileError::Malformed(e)) => {
            tracing::warn!(error = %e, "rejected malformed PDR event");
            json_error(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string()).into_response()
        }
        Err(ReconcileError::Store(e)) => store_error(e),
    }
}

/// GET /pdrs
pub(crate) async fn handle_list_pdrs(State(state): State<Arc<AppState>>) -> Response {
    match state.reconciler.store().scan().await {
        Ok(records) => {
            (StatusCode::OK, Json(serde_json::json!({ "pdrs": records }))).into_response()
        }
        Err(e) => store_error(e),
    }
}

/// GET /pdrs/{manifest_id}
pub(crate) async fn handle_get_pdr(
    State(state): State<Arc<AppState>>,
    Path(manifest_id): Path<String>,
) -> Response {
    match state.reconciler.store().get(&manifest_id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => store_error(e),
    }
}

/// DELETE /pdrs
pub(crate) async fn handle_delete_pdrs(State(state): State<Arc<AppState>>) -> Response {
    match state.reconciler.store().delete_all().await {
        Ok(deleted) => {
            tracing::info!(deleted, "deleted all PDR records");
            (StatusCode::OK, Json(serde_json::json!({ "deleted": deleted }))).into_response()
        }
        Err(e) => store_error(e),
    }
}

/// DELETE /pdrs/{manifest_id}
pub(crate) async fn handle_delete_pdr(
    State(state): State<Arc<AppState>>,
    Path(manifest_id): Path<String>,
) -> Response {
    match state.reconciler.store().delete(&manifest_id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "deleted": 1 }))).into_response(),
        Err(e) => store_error(e),
    }
}

/// GET /acks/success
pub(crate) async fn handle_success_ack() -> impl IntoResponse {
    let body = pdr_core::build_success_ack(OffsetDateTime::now_utc());
    (StatusCode::OK, [(header::CONTENT_TYPE, TEXT_PLAIN)], body)
}

#[derive(Debug, Deserialize)]
pub(crate) struct FailureAckRequest {
    reason: String,
}

/// POST /acks/failure
pub(crate) async fn handle_failure_ack(Json(request): Json<FailureAckRequest>) -> impl IntoResponse {
    let body = pdr_core::build_failure_ack(&request.reason);
    (StatusCode::OK, [(header::CONTENT_TYPE, TEXT_PLAIN)], body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn backend_failure_maps_to_503() {
        let response = store_error(StorageError::Backend("throttled".to_string()));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("throttled"));
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let response = store_error(StorageError::NotFound {
            manifest_id: "X.PDR".to_string(),
        });
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "PDR 'X.PDR' not found");
    }
}
