use crate::handlers::{self, SharedWorkService};
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn create_router(service: SharedWorkService, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/students", post(handlers::create_student))
        .route("/students/:id", get(handlers::get_student))
        .route("/students/:id", delete(handlers::delete_student))
        .route("/students/:id/works", get(handlers::student_works))
        .route("/students/:id/stats", get(handlers::student_stats))
        .route("/assignments", post(handlers::create_assignment))
        .route("/assignments/:id", get(handlers::get_assignment))
        .route("/assignments/:id", delete(handlers::delete_assignment))
        .route("/assignments/:id/works", get(handlers::assignment_works))
        .route("/assignments/:id/stats", get(handlers::assignment_stats))
        .route("/works", post(handlers::create_work))
        .route("/works/upload", post(handlers::create_work_with_upload))
        .route("/works/:id", get(handlers::get_work))
        .route("/works/:id", delete(handlers::delete_work))
        .route("/works/:id/status", put(handlers::update_work_status))
        .route("/works/:id/peers", get(handlers::peer_works))
        .route("/works/:id/reports", get(handlers::work_reports))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{AnalysisServiceClient, FileServiceClient};
    use crate::repo::WorkRepository;
    use crate::service::WorkService;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use plagcheck_common::config::PeerServiceConfig;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/nonexistent")
            .unwrap();
        let repo = WorkRepository::new(pool);
        let peer = PeerServiceConfig::default();
        let files = FileServiceClient::new(&peer).unwrap();
        let analysis = AnalysisServiceClient::new(&peer).unwrap();
        let service = Arc::new(WorkService::new(repo, files, analysis, None));
        create_router(service, 10 * 1024 * 1024)
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
