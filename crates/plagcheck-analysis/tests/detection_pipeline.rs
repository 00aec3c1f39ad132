use plagcheck_analysis::clients::{FileServiceClient, WorkServiceClient};
use plagcheck_analysis::repo::ReportRepository;
use plagcheck_analysis::routes;
use plagcheck_analysis::worker::AnalysisContext;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use plagcheck_common::config::{AnalysisConfig, PeerServiceConfig};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower::ServiceExt;

fn test_context() -> Arc<AnalysisContext> {
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
async fn health_endpoint_is_reachable_without_a_database() {
    let router = routes::create_router(test_context());
    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn digest_comparison_is_symmetric() {
    use plagcheck_analysis::detection::compare_digests;
    assert_eq!(compare_digests("abcd", "abce"), compare_digests("abce", "abcd"));
}

#[test]
fn empty_digests_do_not_match() {
    use plagcheck_analysis::detection::compare_digests;
    assert_eq!(compare_digests("", ""), None);
}
