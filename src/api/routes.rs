//! API route definitions

use axum::routing::{get, post};
use axum::Router;

use super::handlers;
use super::server::AppState;
use super::websocket;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/status", get(handlers::health::status))
        .nest("/api", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/targets", get(handlers::targets::resolve_targets))
        .route("/rotations", post(handlers::rotations::create_rotation))
        .route("/history", get(handlers::history::list_history))
        .route("/history/:proxy_id/last", get(handlers::history::last_rotation))
        .route("/ws/rotations", get(websocket::rotations::rotations_ws))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::services::rotation_service::test_support::{fixture, Fixture, US_TRIGGER};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app(f: &Fixture) -> Router {
        create_router(AppState::new(f.service.clone(), test_config(), None))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("Authorization", "Bearer token")
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("Authorization", "Bearer token")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let f = fixture();
        let response = app(&f)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_status_reports_history_backend() {
        let f = fixture();
        let response = app(&f).oneshot(get("/api/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["history"]["backend"], "memory");
        assert_eq!(body["database"]["status"], "unused");
    }

    #[tokio::test]
    async fn test_targets_ambiguous_lists_candidates() {
        let f = fixture();
        let response = app(&f)
            .oneshot(get("/api/targets?identifier=DE"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["resolution"]["outcome"], "ambiguous");
        assert_eq!(body["resolution"]["proxies"].as_array().unwrap().len(), 2);
        assert!(body["resolution"]["proxies"][0]
            .get("rotation_trigger_url")
            .is_none());
        assert!(body["message"].as_str().unwrap().contains("12_DE_abc"));
    }

    #[tokio::test]
    async fn test_targets_without_credential_is_unauthorized() {
        let f = fixture();
        let response = app(&f)
            .oneshot(
                Request::builder()
                    .uri("/api/targets?identifier=US")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_filter_is_bad_request() {
        let f = fixture();
        let response = app(&f)
            .oneshot(get("/api/targets?filter=stale"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"]
            .as_str()
            .unwrap()
            .contains("stale"));
    }

    #[tokio::test]
    async fn test_rotation_then_history() {
        let f = fixture();
        f.transport.push_ok(US_TRIGGER, 200, "{}");
        let app = app(&f);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/rotations",
                serde_json::json!({ "identifier": "US", "wait_for_completion": false }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["outcome"], "completed");
        assert_eq!(body["results"][0]["proxy_id"], "p2");
        assert_eq!(body["results"][0]["status"], "unconfirmed");

        let response = app
            .clone()
            .oneshot(get("/api/history?proxy_id=p2"))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["entries"][0]["error_code"], "verification_skipped");

        let response = app.clone().oneshot(get("/api/history/p2/last")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get("/api/history/p9/last")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rotation_rejects_zero_budget() {
        let f = fixture();
        let response = app(&f)
            .oneshot(post_json(
                "/api/rotations",
                serde_json::json!({ "identifier": "US", "max_wait_ms": 0 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rotation_needing_selection() {
        let f = fixture();
        let response = app(&f)
            .oneshot(post_json("/api/rotations", serde_json::json!({ "identifier": "DE" })))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["outcome"], "needs_selection");
        assert_eq!(body["candidates"].as_array().unwrap().len(), 2);
    }
}
