//! `pdr serve` -- HTTP JSON API over the PDR status reconciler.
//!
//! Records live in an in-memory store for the lifetime of the process.
//!
//! Endpoints:
//! - GET    /health                 - Server status (exempt from auth)
//! - POST   /events                 - Reconcile one workflow message
//! - GET    /pdrs                   - All records, ordered by manifest id
//! - GET    /pdrs/{manifest_id}     - One record
//! - DELETE /pdrs                   - Delete every record
//! - DELETE /pdrs/{manifest_id}     - Delete one record
//! - GET    /acks/success           - Success acknowledgment (text/plain)
//! - POST   /acks/failure           - Failure acknowledgment (text/plain)

mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{middleware as axum_middleware, Json, Router};
use pdr_core::{Projector, Reconciler};
use pdr_storage::MemoryStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use self::handlers::{
    handle_delete_pdr, handle_delete_pdrs, handle_failure_ack, handle_get_pdr, handle_health,
    handle_list_pdrs, handle_not_found, handle_post_event, handle_success_ack,
};
use self::middleware::auth_middleware;
use self::state::AppState;
use crate::config::Config;

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Assemble the router with auth, CORS, body limit and request tracing.
pub(crate) fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/events", axum::routing::post(handle_post_event))
        .route("/pdrs", get(handle_list_pdrs).delete(handle_delete_pdrs))
        .route(
            "/pdrs/{manifest_id}",
            get(handle_get_pdr).delete(handle_delete_pdr),
        )
        .route("/acks/success", get(handle_success_ack))
        .route("/acks/failure", axum::routing::post(handle_failure_ack))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Start the HTTP server and run until Ctrl+C.
pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let reconciler = Reconciler::new(MemoryStore::new(), Projector::new()?);

    let api_key = config.auth.api_key;
    if api_key.is_some() {
        tracing::info!("API key authentication enabled");
    }

    let app = build_router(Arc::new(AppState::new(reconciler, api_key)));

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("PDR status service listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C; shutting down");
        return;
    }
    tracing::info!("received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt; // oneshot

    fn make_router(api_key: Option<&str>) -> Router {
        let reconciler = Reconciler::new(MemoryStore::new(), Projector::new().unwrap());
        build_router(Arc::new(AppState::new(
            reconciler,
            api_key.map(str::to_string),
        )))
    }

    /// Content type and body text of one in-process response.
    struct Reply {
        content_type: String,
        text: String,
    }

    impl Reply {
        fn json(&self) -> serde_json::Value {
            serde_json::from_str(&self.text).unwrap()
        }
    }

    async fn call(router: &Router, req: Request<Body>) -> (StatusCode, Reply) {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let reply = Reply {
            content_type,
            text: String::from_utf8_lossy(&bytes).into_owned(),
        };
        (status, reply)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn delete(uri: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn event(status: &str, running: usize, completed: usize) -> serde_json::Value {
        json!({
            "execution": {
                "state_machine": "arn:aws:states:us-east-1:123456789012:stateMachine:ParsePdr",
                "name": "run-1",
                "workflow_start_time": 1_700_000_000_000i64
            },
            "meta": {
                "status": status,
                "collection": { "name": "MOD09GQ", "version": "006" },
                "provider": { "id": "s3_provider" }
            },
            "payload": {
                "pdr": { "name": "MOD09GQ.PDR" },
                "running": vec![json!({}); running],
                "completed": vec![json!({}); completed]
            }
        })
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let router = make_router(None);
        let (status, body) = call(&router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.json()["status"], "ok");
    }

    #[tokio::test]
    async fn stale_running_event_does_not_regress_record() {
        let router = make_router(None);

        let (status, body) = call(&router, post_json("/events", event("running", 7, 3))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.json()["committed"], true);

        let (_, body) = call(&router, post_json("/events", event("completed", 0, 10))).await;
        assert_eq!(body.json()["record"]["percent_complete"], 100.0);

        let (status, body) = call(&router, post_json("/events", event("running", 7, 3))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.json(), json!({ "committed": false, "record": null }));

        let (status, body) = call(&router, get("/pdrs/MOD09GQ.PDR")).await;
        assert_eq!(status, StatusCode::OK);
        let record = body.json();
        assert_eq!(record["status"], "completed");
        assert_eq!(record["percent_complete"], 100.0);
        assert_eq!(record["collection_id"], "MOD09GQ___006");
    }

    #[tokio::test]
    async fn event_without_pdr_is_not_committed() {
        let router = make_router(None);
        let (status, body) = call(
            &router,
            post_json("/events", json!({ "meta": { "status": "running" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.json()["committed"], false);

        let (_, body) = call(&router, get("/pdrs")).await;
        assert_eq!(body.json(), json!({ "pdrs": [] }));
    }

    #[tokio::test]
    async fn malformed_event_is_422() {
        let router = make_router(None);
        let mut bad = event("running", 1, 0);
        bad["meta"]["status"] = json!("queued");
        let (status, body) = call(&router, post_json("/events", bad)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.json()["error"].as_str().unwrap().contains("queued"));
    }

    #[tokio::test]
    async fn invalid_json_is_400() {
        let router = make_router(None);
        let req = Request::builder()
            .method("POST")
            .uri("/events")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = call(&router, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_pdr_is_404() {
        let router = make_router(None);
        let (status, body) = call(&router, get("/pdrs/NOPE.PDR")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.json()["error"].as_str().unwrap().contains("NOPE.PDR"));

        let (status, _) = call(&router, delete("/pdrs/NOPE.PDR")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_routes_clear_records() {
        let router = make_router(None);
        call(&router, post_json("/events", event("completed", 0, 2))).await;

        let (status, body) = call(&router, delete("/pdrs/MOD09GQ.PDR")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.json()["deleted"], 1);

        call(&router, post_json("/events", event("completed", 0, 2))).await;
        let (status, body) = call(&router, delete("/pdrs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.json()["deleted"], 1);

        let (_, body) = call(&router, get("/pdrs")).await;
        assert_eq!(body.json()["pdrs"], json!([]));
    }

    #[tokio::test]
    async fn success_ack_is_plain_text() {
        let router = make_router(None);
        let (status, body) = call(&router, get("/acks/success")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.content_type.starts_with("text/plain"));
        assert!(body
            .text
            .starts_with("MESSAGE_TYPE = \"SHORTPAN\";\nDISPOSITION = \"SUCCESSFUL\";\nTIME_STAMP = "));
        assert!(body.text.ends_with("Z;\n"));
    }

    #[tokio::test]
    async fn failure_ack_carries_reason() {
        let router = make_router(None);
        let (status, body) = call(
            &router,
            post_json("/acks/failure", json!({ "reason": "INVALID FILE COUNT" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.content_type.starts_with("text/plain"));
        assert_eq!(
            body.text,
            "MESSAGE_TYPE = \"SHORTPDRD\";\nDISPOSITION = \"INVALID FILE COUNT\";\n"
        );
    }

    #[tokio::test]
    async fn api_key_guards_everything_but_health() {
        let router = make_router(Some("secret"));

        let (status, _) = call(&router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&router, get("/pdrs")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .uri("/pdrs")
            .header("authorization", "Bearer wrong")
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(&router, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let req = Request::builder()
            .uri("/pdrs")
            .header("x-api-key", "secret")
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(&router, req).await;
        assert_eq!(status, StatusCode::OK);

        let req = Request::builder()
            .uri("/pdrs")
            .header("authorization", "Bearer secret")
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(&router, req).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let router = make_router(None);
        let (status, body) = call(&router, get("/contracts")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.json()["error"], "not found");
    }
}
