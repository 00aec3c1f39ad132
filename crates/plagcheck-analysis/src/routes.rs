use crate::handlers::{
    analyze_batch, assignment_stats, export_reports, get_report, get_report_by_work, health_check,
    list_reports, render_wordcloud, reports_for_assignment, reports_for_student, retry_failed,
    student_stats, SharedAnalysisContext,
};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn create_router(ctx: SharedAnalysisContext) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/reports", get(list_reports))
        .route("/reports/export", get(export_reports))
        .route("/analysis/retry", post(retry_failed))
        .route("/reports/batch", post(analyze_batch))
        .route("/reports/:id", get(get_report))
        .route("/reports/:id/wordcloud", post(render_wordcloud))
        .route("/reports/work/:work_id", get(get_report_by_work))
        .route("/reports/assignment/:id", get(reports_for_assignment))
        .route("/reports/student/:id", get(reports_for_student))
        .route("/assignments/:id/stats", get(assignment_stats))
        .route("/students/:id/stats", get(student_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{FileServiceClient, WorkServiceClient};
    use crate::repo::ReportRepository;
    use crate::worker::AnalysisContext;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use plagcheck_common::config::{AnalysisConfig, PeerServiceConfig};
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_context() -> SharedAnalysisContext {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/plagcheck_analysis_test")
            .expect("lazy pool construction should not touch the network");
        let peer = PeerServiceConfig::default();
        Arc::new(AnalysisContext {
            repo: ReportRepository::new(pool),
            files: FileServiceClient::new(&peer).unwrap(),
            works: WorkServiceClient::new(&peer).unwrap(),
            broker: None,
            config: AnalysisConfig::default(),
            wordcloud_url: "http://localhost:9000/wordcloud".to_string(),
        })
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        let router = create_router(test_context());
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
