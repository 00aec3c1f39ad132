//! Retrying reverse proxy (§4.5 "Proxy behavior"). Buffers the inbound
//! request body so the same bytes can be replayed across retries, since
//! `reqwest` needs a fresh request built on every attempt.

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use plagcheck_common::config::PeerServiceConfig;
use plagcheck_common::http_client::{is_retryable_status, send_with_retry, RetryPolicy};
use serde_json::json;
use std::time::Duration;
use tracing::warn;

#[derive(Clone)]
pub struct Backend {
    pub name: &'static str,
    base_url: String,
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl Backend {
    pub fn new(name: &'static str, config: &PeerServiceConfig) -> reqwest::Result<Self> {
        Ok(Self {
            name,
            base_url: config.url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout))
                .build()?,
            policy: RetryPolicy::new(config.retry_count, config.retry_delay),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.contains(&name.to_ascii_lowercase().as_str())
}

/// Forwards one request to `backend`, stripping the gateway's own `/api/v1`
/// prefix, injecting `X-Forwarded-*` headers, and retrying per the backend's
/// policy with linear backoff. Exhausted retries (or a final retryable
/// status) become a standardized 503 envelope (§4.5).
pub async fn forward(
    backend: &Backend,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    client_ip: &str,
) -> Response {
    let downstream_path = strip_prefix(uri.path(), "/api/v1");
    let path_and_query = match uri.query() {
        Some(q) => format!("{downstream_path}?{q}"),
        None => downstream_path.to_string(),
    };
    let url = format!("{}{}", backend.base_url, path_and_query);

    let outcome = send_with_retry(&backend.policy, || {
        let mut req = backend.client.request(method.clone(), &url);
        for (name, value) in headers.iter() {
            if !is_hop_by_hop(name.as_str()) {
                req = req.header(name, value);
            }
        }
        req = req
            .header("x-forwarded-for", client_ip)
            .header("x-forwarded-proto", "http");
        if let Some(host) = headers.get(axum::http::header::HOST) {
            req = req.header("x-forwarded-host", host);
        }
        req.body(body.clone()).send()
    })
    .await;

    match outcome {
        Ok(response) if !is_retryable_status(response.status()) => relay(response).await,
        Ok(response) => {
            warn!(backend = backend.name, status = %response.status(), "backend exhausted retries with a retryable status");
            service_unavailable(uri.path())
        }
        Err(e) => {
            warn!(backend = backend.name, error = %e, "backend unreachable after retries");
            service_unavailable(uri.path())
        }
    }
}

fn strip_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    path.strip_prefix(prefix).unwrap_or(path)
}

async fn relay(response: reqwest::Response) -> Response {
    let status = response.status();
    let mut headers = HeaderMap::new();
    for (name, value) in response.headers().iter() {
        if !is_hop_by_hop(name.as_str()) {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_str().as_bytes()),
                HeaderValue::from_bytes(value.as_bytes()),
            ) {
                headers.insert(name, value);
            }
        }
    }
    let body = response
        .bytes()
        .await
        .unwrap_or_else(|_| Bytes::new());

    let mut builder = Response::builder().status(status);
    if let Some(h) = builder.headers_mut() {
        *h = headers;
    }
    builder
        .body(axum::body::Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn service_unavailable(path: &str) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        axum::Json(json!({
            "error": "service_unavailable",
            "message": "backend did not respond successfully after retries",
            "code": "SERVICE_UNAVAILABLE",
            "path": path,
            "timestamp": Utc::now(),
        })),
    )
        .into_response()
}
