//! Shared error taxonomy for the plagcheck platform.
//!
//! Every service maps its internal errors onto this enum before crossing an
//! HTTP boundary, the same way `matrixon-api::error::MatrixonError` maps onto
//! `StatusCode`. Variants are the taxonomy of §7: validation, not-found,
//! conflict, peer-unavailable, and internal.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("gone: {0}")]
    Gone(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("upstream service error: {0}")]
    Upstream(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    /// Machine-readable `code` field for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Gone(_) => "GONE",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ServiceError::UnsupportedMediaType(_) => "UNSUPPORTED_MEDIA_TYPE",
            ServiceError::Upstream(_) => "BAD_GATEWAY",
            ServiceError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ServiceError::Internal(_) | ServiceError::Database(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Gone(_) => StatusCode::GONE,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ServiceError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServiceError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Internal(_) | ServiceError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// True for errors a broker consumer should nack+requeue rather than ack+drop.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ServiceError::Upstream(_) | ServiceError::ServiceUnavailable(_) | ServiceError::Database(_)
        )
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        if matches!(self, ServiceError::Internal(_) | ServiceError::Database(_)) {
            tracing::error!(error = %self, "request failed with internal error");
        }
        let status = self.status();
        let body = Json(json!({
            "success": false,
            "error": status.canonical_reason().unwrap_or("ERROR"),
            "message": self.to_string(),
            "code": self.code(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404_and_code() {
        let err = ServiceError::NotFound("work 123".into());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "NOT_FOUND");
        assert!(!err.is_transient());
    }

    #[test]
    fn upstream_and_service_unavailable_are_transient() {
        assert!(ServiceError::Upstream("boom".into()).is_transient());
        assert!(ServiceError::ServiceUnavailable("boom".into()).is_transient());
        assert!(!ServiceError::Validation("boom".into()).is_transient());
    }
}
