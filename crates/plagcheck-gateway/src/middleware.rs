//! The gateway's fixed-order middleware stack (§4.5): request-id, client-IP
//! normalization, path canonicalization, HEAD-from-GET, compression, CORS,
//! timeout, request logging, panic recovery. Assembled in `routes.rs`.

use axum::extract::{ConnectInfo, Request};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::Next;
use axum::response::Response;
use plagcheck_common::config::CorsConfig;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub const CLIENT_IP_HEADER: &str = "x-plagcheck-client-ip";

/// Records the caller's address into a request header the proxy later reads,
/// preferring a chained `X-Forwarded-For` if this gateway sits behind
/// another proxy.
pub async fn client_ip_normalization(
    connect_info: Option<ConnectInfo<SocketAddr>>,
    mut req: Request,
    next: Next,
) -> Response {
    let socket_ip = connect_info.map(|ConnectInfo(addr)| addr.ip().to_string());
    let ip = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .or(socket_ip)
        .unwrap_or_else(|| "unknown".to_string());
    if let Ok(value) = HeaderValue::from_str(&ip) {
        req.headers_mut()
            .insert(HeaderName::from_static(CLIENT_IP_HEADER), value);
    }
    next.run(req).await
}

pub fn client_ip_from_headers(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(CLIENT_IP_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Axum already routes `HEAD` against `GET` handlers; this only needs to
/// drop the body on the way out so clients see an empty-bodied response.
pub async fn head_from_get(req: Request, next: Next) -> Response {
    let is_head = req.method() == Method::HEAD;
    let response = next.run(req).await;
    if is_head {
        let (parts, _) = response.into_parts();
        Response::from_parts(parts, axum::body::Body::empty())
    } else {
        response
    }
}

pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        AllowOrigin::list(parsed)
    };
    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();

    let mut layer = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .max_age(Duration::from_secs(config.max_age));
    if config.allow_credentials {
        layer = layer.allow_credentials(true);
    }
    layer
}
