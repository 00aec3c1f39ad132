use axum::body::Body;
use axum::http::{Request, StatusCode};
use plagcheck_files::config::FileServiceConfig;
use plagcheck_files::digest::HashAlgorithm;
use plagcheck_files::routes::create_router;
use plagcheck_files::service::{FileService, PutRequest};
use plagcheck_files::storage::ObjectStore;
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn health_endpoint_is_reachable_without_a_database() {
    let config = FileServiceConfig::default();
    let dir = tempfile::tempdir().unwrap();
    let store = ObjectStore::new_fs(dir.path().to_str().unwrap()).unwrap();

    // No live database in this test; only /health avoids touching the repo.
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy(&config.database.connection_string())
        .unwrap();
    let repo = plagcheck_files::repo::FileRepository::new(pool);
    let service = Arc::new(FileService::new(repo, store, config));
    let app = create_router(service, 10 * 1024 * 1024);

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

#[test]
fn digest_of_identical_bytes_is_stable_across_algorithms() {
    for algo in [
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha512,
        HashAlgorithm::Sha1,
        HashAlgorithm::Md5,
    ] {
        let a = algo.digest(b"same content");
        let b = algo.digest(b"same content");
        assert_eq!(a, b, "{:?} digest should be deterministic", algo);
    }
}

#[tokio::test]
async fn put_rejects_disallowed_extension_before_touching_storage_or_db() {
    let config = FileServiceConfig::default();
    let dir = tempfile::tempdir().unwrap();
    let store = ObjectStore::new_fs(dir.path().to_str().unwrap()).unwrap();
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy(&config.database.connection_string())
        .unwrap();
    let repo = plagcheck_files::repo::FileRepository::new(pool);
    let service = FileService::new(repo, store, config);

    let result = service
        .put(PutRequest {
            original_name: "virus.exe".to_string(),
            mime_type: "application/octet-stream".to_string(),
            bytes: b"x".to_vec(),
            uploaded_by: None,
        })
        .await;

    assert!(result.is_err());
}
