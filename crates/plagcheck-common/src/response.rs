//! The success-side response envelope, `{success, data, timestamp}` (§6).
//!
//! Errors go through [`crate::error::ServiceError`]'s own `IntoResponse`
//! impl; this module only wraps successful payloads.

use axum::{response::IntoResponse, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_payload_with_success_true() {
        let resp = ApiResponse::success(vec![1, 2, 3]);
        assert!(resp.success);
        assert_eq!(resp.data, vec![1, 2, 3]);
    }
}
