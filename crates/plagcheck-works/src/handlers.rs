use crate::models::{CreateAssignmentRequest, CreateStudentRequest, CreateWorkRequest, WorkStatus};
use crate::service::WorkService;
use axum::extract::{Multipart, Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use plagcheck_common::error::{Result, ServiceError};
use plagcheck_common::response::ApiResponse;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

pub type SharedWorkService = Arc<WorkService>;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
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
pub struct PeerWorksQuery {
    pub assignment_id: Uuid,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

pub async fn create_student(
    State(service): State<SharedWorkService>,
    Json(req): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse> {
    let student = service.create_student(&req.display_name, &req.email).await?;
    Ok(ApiResponse::success(student))
}

pub async fn get_student(
    State(service): State<SharedWorkService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(ApiResponse::success(service.get_student(id).await?))
}

pub async fn delete_student(
    State(service): State<SharedWorkService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    service.delete_student(id).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": true })))
}

pub async fn student_works(
    State(service): State<SharedWorkService>,
    Path(id): Path<Uuid>,
    Query(q): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let works = service.works_for_student(id, q.page, q.limit).await?;
    Ok(ApiResponse::success(works))
}

pub async fn student_stats(
    State(service): State<SharedWorkService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(ApiResponse::success(service.student_stats(id).await?))
}

pub async fn create_assignment(
    State(service): State<SharedWorkService>,
    Json(req): Json<CreateAssignmentRequest>,
) -> Result<impl IntoResponse> {
    let assignment = service
        .create_assignment(&req.title, req.description.as_deref())
        .await?;
    Ok(ApiResponse::success(assignment))
}

pub async fn get_assignment(
    State(service): State<SharedWorkService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(ApiResponse::success(service.get_assignment(id).await?))
}

pub async fn delete_assignment(
    State(service): State<SharedWorkService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    service.delete_assignment(id).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": true })))
}

pub async fn assignment_works(
    State(service): State<SharedWorkService>,
    Path(id): Path<Uuid>,
    Query(q): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let works = service.works_for_assignment(id, q.page, q.limit).await?;
    Ok(ApiResponse::success(works))
}

pub async fn assignment_stats(
    State(service): State<SharedWorkService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(ApiResponse::success(service.assignment_stats(id).await?))
}

/// Metadata-only create.
pub async fn create_work(
    State(service): State<SharedWorkService>,
    Json(req): Json<CreateWorkRequest>,
) -> Result<impl IntoResponse> {
    let work = service.create_work(req.student_id, req.assignment_id).await?;
    Ok(ApiResponse::success(work))
}

/// Upload-create saga entry point (multipart: student_id, assignment_id, file).
pub async fn create_work_with_upload(
    State(service): State<SharedWorkService>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut student_id = None;
    let mut assignment_id = None;
    let mut filename = None;
    let mut mime = None;
    let mut bytes = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::Validation(format!("invalid multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "student_id" => {
                let text = field.text().await.map_err(|e| ServiceError::Validation(e.to_string()))?;
                student_id = Some(
                    text.parse::<Uuid>()
                        .map_err(|_| ServiceError::Validation("invalid student_id".into()))?,
                );
            }
            "assignment_id" => {
                let text = field.text().await.map_err(|e| ServiceError::Validation(e.to_string()))?;
                assignment_id = Some(
                    text.parse::<Uuid>()
                        .map_err(|_| ServiceError::Validation("invalid assignment_id".into()))?,
                );
            }
            "file" => {
                filename = field.file_name().map(str::to_string);
                mime = field.content_type().map(str::to_string);
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

    let student_id = student_id.ok_or_else(|| ServiceError::Validation("missing student_id".into()))?;
    let assignment_id =
        assignment_id.ok_or_else(|| ServiceError::Validation("missing assignment_id".into()))?;
    let bytes = bytes.ok_or_else(|| ServiceError::Validation("missing file field".into()))?;
    let filename = filename.unwrap_or_else(|| "submission.bin".to_string());
    let mime = mime.unwrap_or_else(|| "application/octet-stream".to_string());

    let work = service
        .create_work_with_upload(student_id, assignment_id, &filename, &mime, bytes.to_vec())
        .await?;
    Ok(ApiResponse::success(work))
}

pub async fn get_work(
    State(service): State<SharedWorkService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(ApiResponse::success(service.get_work(id).await?))
}

pub async fn delete_work(
    State(service): State<SharedWorkService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    service.delete_work(id).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": true })))
}

pub async fn update_work_status(
    State(service): State<SharedWorkService>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<impl IntoResponse> {
    let status = WorkStatus::parse(&req.status)
        .ok_or_else(|| ServiceError::Validation(format!("unknown status '{}'", req.status)))?;
    let work = service.set_status(id, status).await?;
    Ok(ApiResponse::success(work))
}

pub async fn peer_works(
    State(service): State<SharedWorkService>,
    Path(id): Path<Uuid>,
    Query(q): Query<PeerWorksQuery>,
) -> Result<impl IntoResponse> {
    let peers = service
        .peer_works(q.assignment_id, id, q.page, q.limit)
        .await?;
    Ok(ApiResponse::success(peers))
}

/// §4.2.1: `GET /works/{id}/reports` passthrough to C4.
pub async fn work_reports(
    State(service): State<SharedWorkService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(ApiResponse::success(service.reports_for_work(id).await?))
}

pub async fn health_check() -> impl IntoResponse {
    ApiResponse::success(serde_json::json!({ "status": "ok", "service": "plagcheck-works" }))
}
