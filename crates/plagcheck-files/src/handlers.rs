use crate::service::{FileService, PutRequest};
use axum::body::Bytes;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use plagcheck_common::error::{Result, ServiceError};
use plagcheck_common::response::ApiResponse;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub type SharedFileService = Arc<FileService>;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct DigestQuery {
    pub hash: String,
    pub size: i64,
}

#[derive(Debug, Deserialize)]
pub struct PresignQuery {
    #[serde(default = "default_expires")]
    pub expires: u64,
}

fn default_expires() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
pub struct BytesUploadRequest {
    pub file_name: String,
    pub file_bytes: String,
    pub uploaded_by: Option<String>,
    pub metadata: Option<Value>,
}

pub async fn put_file(
    State(service): State<SharedFileService>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut original_name = None;
    let mut mime_type = None;
    let mut bytes: Option<Bytes> = None;
    let mut uploaded_by = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::Validation(format!("invalid multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "uploaded_by" => {
                uploaded_by = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ServiceError::Validation(e.to_string()))?,
                );
            }
            "file" => {
                original_name = field.file_name().map(str::to_string);
                mime_type = field.content_type().map(str::to_string);
                bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ServiceError::Validation(e.to_string()))?,
                );
            }
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| ServiceError::Validation("missing 'file' field".into()))?;
    let original_name = original_name.unwrap_or_else(|| "upload.bin".to_string());
    let mime_type = mime_type.unwrap_or_else(|| {
        mime_guess::from_path(&original_name)
            .first_or_octet_stream()
            .to_string()
    });

    let result = service
        .put(PutRequest {
            original_name,
            mime_type,
            bytes: bytes.to_vec(),
            uploaded_by,
            metadata: None,
        })
        .await?;

    Ok(ApiResponse::success(result))
}

/// §6 `POST /files/upload/bytes`: JSON body carrying base64-encoded content,
/// for callers that can't build a multipart request.
pub async fn upload_bytes(
    State(service): State<SharedFileService>,
    Json(req): Json<BytesUploadRequest>,
) -> Result<impl IntoResponse> {
    let bytes = BASE64
        .decode(req.file_bytes.as_bytes())
        .map_err(|e| ServiceError::Validation(format!("invalid base64 file_bytes: {e}")))?;
    let mime_type = mime_guess::from_path(&req.file_name)
        .first_or_octet_stream()
        .to_string();

    let result = service
        .put(PutRequest {
            original_name: req.file_name,
            mime_type,
            bytes,
            uploaded_by: req.uploaded_by,
            metadata: req.metadata,
        })
        .await?;

    Ok(ApiResponse::success(result))
}

/// §6 `GET /files/{id}/url?expires=`: presigned download URL.
pub async fn presigned_url(
    State(service): State<SharedFileService>,
    Path(id): Path<Uuid>,
    Query(query): Query<PresignQuery>,
) -> Result<impl IntoResponse> {
    let url = service.presigned_url(id, Duration::from_secs(query.expires)).await?;
    Ok(ApiResponse::success(serde_json::json!({ "url": url, "expires_in": query.expires })))
}

pub async fn get_file(
    State(service): State<SharedFileService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let (file, bytes) = service.get_bytes(id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, file.mime_type.clone()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.original_name),
            ),
        ],
        bytes,
    ))
}

pub async fn get_file_info(
    State(service): State<SharedFileService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let file = service.get_info(id).await?;
    Ok(ApiResponse::success(file))
}

pub async fn get_by_digest(
    State(service): State<SharedFileService>,
    Query(query): Query<DigestQuery>,
) -> Result<impl IntoResponse> {
    let file = service.get_by_digest(&query.hash, query.size).await?;
    Ok(ApiResponse::success(file))
}

pub async fn delete_file(
    State(service): State<SharedFileService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    service.delete(id).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": true })))
}

pub async fn list_files(
    State(service): State<SharedFileService>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let files = service
        .list(query.q.as_deref(), query.page, query.limit)
        .await?;
    Ok(ApiResponse::success(files))
}

pub async fn file_stats(State(service): State<SharedFileService>) -> Result<impl IntoResponse> {
    let stats = service.stats().await?;
    Ok(ApiResponse::success(stats))
}

pub async fn health_check() -> impl IntoResponse {
    ApiResponse::success(serde_json::json!({ "status": "ok", "service": "plagcheck-files" }))
}
