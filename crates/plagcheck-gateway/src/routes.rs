use crate::health::{admin_info, health_check, liveness, readiness};
use crate::middleware::{client_ip_from_headers, client_ip_normalization, cors_layer, head_from_get};
use crate::proxy::{self, Backend};
use crate::state::GatewayState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, Method, Uri};
use axum::middleware;
use axum::response::Response;
use axum::routing::{any, get};
use axum::Router;
use plagcheck_common::config::CorsConfig;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

const REQUEST_ID_HEADER: &str = "x-request-id";

async fn proxy_to_files(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let client_ip = client_ip_from_headers(&headers);
    proxy::forward(&state.files, method, uri, headers, body, &client_ip).await
}

async fn proxy_to_works(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let client_ip = client_ip_from_headers(&headers);
    proxy::forward(&state.works, method, uri, headers, body, &client_ip).await
}

async fn proxy_to_analysis(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let client_ip = client_ip_from_headers(&headers);
    proxy::forward(&state.analysis, method, uri, headers, body, &client_ip).await
}

/// §4.5.1 routing table, layered with the fixed-order middleware stack
/// (§4.5): request-id and client-IP outermost, panic recovery innermost.
pub fn create_router(state: Arc<GatewayState>, cors: &CorsConfig, request_timeout: Duration) -> Router {
    let proxied = Router::new()
        .route("/api/v1/files", any(proxy_to_files))
        .route("/api/v1/files/*rest", any(proxy_to_files))
        .route("/api/v1/works", any(proxy_to_works))
        .route("/api/v1/works/*rest", any(proxy_to_works))
        .route("/api/v1/students", any(proxy_to_works))
        .route("/api/v1/students/*rest", any(proxy_to_works))
        .route("/api/v1/assignments", any(proxy_to_works))
        .route("/api/v1/assignments/*rest", any(proxy_to_works))
        .route("/api/v1/reports", any(proxy_to_analysis))
        .route("/api/v1/reports/*rest", any(proxy_to_analysis))
        .route("/api/v1/analysis", any(proxy_to_analysis))
        .route("/api/v1/analysis/*rest", any(proxy_to_analysis))
        .with_state(state.clone());

    let local = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .route("/live", get(liveness))
        .route("/api/v1/admin/info", get(admin_info))
        .with_state(state);

    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    // Layers are added innermost-first; the last one added wraps everything
    // before it, so this chain ends up executing in the documented order:
    // request-id -> client-ip -> path-canon -> head-from-get -> compression
    // -> cors -> timeout -> request logger -> panic recovery.
    local
        .merge(proxied)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors_layer(cors))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(head_from_get))
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(middleware::from_fn(client_ip_normalization))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use plagcheck_common::config::PeerServiceConfig;
    use std::time::Instant;
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
    async fn health_endpoint_never_touches_a_backend() {
        let router = create_router(test_state(), &CorsConfig::default(), Duration::from_secs(5));
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
