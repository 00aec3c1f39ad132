use crate::handlers::{self, SharedFileService};
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn create_router(service: SharedFileService, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/files", get(handlers::list_files))
        .route("/files/upload", post(handlers::put_file))
        .route("/files/upload/bytes", post(handlers::upload_bytes))
        .route("/files/stats", get(handlers::file_stats))
        .route("/files/download/by-hash", get(handlers::get_by_digest))
        .route("/files/:id", get(handlers::get_file))
        .route("/files/:id/info", get(handlers::get_file_info))
        .route("/files/:id/url", get(handlers::presigned_url))
        .route("/files/:id", delete(handlers::delete_file))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileServiceConfig;
    use crate::repo::FileRepository;
    use crate::service::FileService;
    use crate::storage::ObjectStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let config = FileServiceConfig::default();
        let store = ObjectStore::new_fs(std::env::temp_dir().to_str().unwrap()).unwrap();
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/nonexistent")
            .unwrap();
        let repo = FileRepository::new(pool);
        let service = Arc::new(FileService::new(repo, store, config));
        create_router(service, 1024 * 1024)
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        let app = test_router();
        let response = app
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
