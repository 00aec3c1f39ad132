use axum::body::Body;
use axum::http::{Request, StatusCode};
use plagcheck_common::config::{CorsConfig, PeerServiceConfig};
use plagcheck_gateway::proxy::Backend;
use plagcheck_gateway::routes::create_router;
use plagcheck_gateway::state::GatewayState;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceExt;

fn test_state() -> Arc<GatewayState> {
    let peer = PeerServiceConfig::default();
    Arc::new(GatewayState {
        files: Backend::new("files", &peer).unwrap(),
        works: Backend::new("works", &peer).unwrap(),
        analysis: Backend::new("analysis", &peer).unwrap(),
        started_at: Instant::now(),
    })
}

#[tokio::test]
async fn health_ready_live_are_local_and_never_proxy() {
    let router = create_router(test_state(), &CorsConfig::default(), Duration::from_secs(5));
    for path in ["/health", "/ready", "/live"] {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "path {path} should be OK");
    }
}

#[tokio::test]
async fn admin_info_returns_backend_metadata() {
    let router = create_router(test_state(), &CorsConfig::default(), Duration::from_secs(5));
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/admin/info")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn proxied_route_returns_503_when_backend_is_unreachable() {
    let router = create_router(test_state(), &CorsConfig::default(), Duration::from_secs(5));
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/files/some-id/info")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
