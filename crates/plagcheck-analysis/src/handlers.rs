use crate::models::{BatchAnalyzeRequest, ReportStatus};
use crate::worker::AnalysisContext;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use plagcheck_common::error::{Result, ServiceError};
use plagcheck_common::http_client::{build_client, send_with_retry, RetryPolicy};
use plagcheck_common::response::ApiResponse;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub type SharedAnalysisContext = Arc<AnalysisContext>;

#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    pub work_id: Option<Uuid>,
    pub assignment_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub status: Option<String>,
    pub plagiarism_flag: Option<bool>,
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
pub struct ExportQuery {
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "json".to_string()
}

#[derive(Debug, Deserialize)]
pub struct RetryQuery {
    #[serde(default = "default_retry_limit")]
    pub limit: i64,
}

fn default_retry_limit() -> i64 {
    20
}

pub async fn health_check() -> impl IntoResponse {
    ApiResponse::success(json!({ "status": "ok", "service": "plagcheck-analysis" }))
}

pub async fn get_report(State(ctx): State<SharedAnalysisContext>, Path(id): Path<Uuid>) -> Result<impl IntoResponse> {
    Ok(ApiResponse::success(ctx.repo.find_by_id(id).await?))
}

/// §7 "User-visible behavior": reads against a work with no report yet
/// return `{report: null}`, never a 404.
pub async fn get_report_by_work(
    State(ctx): State<SharedAnalysisContext>,
    Path(work_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let report = ctx.repo.find_by_work_id(work_id).await?;
    Ok(ApiResponse::success(json!({ "report": report })))
}

pub async fn reports_for_assignment(
    State(ctx): State<SharedAnalysisContext>,
    Path(id): Path<Uuid>,
    Query(q): Query<ReportsQuery>,
) -> Result<impl IntoResponse> {
    let reports = ctx
        .repo
        .search(None, Some(id), None, q.status.as_deref(), q.plagiarism_flag, q.page, q.limit)
        .await?;
    Ok(ApiResponse::success(reports))
}

pub async fn reports_for_student(
    State(ctx): State<SharedAnalysisContext>,
    Path(id): Path<Uuid>,
    Query(q): Query<ReportsQuery>,
) -> Result<impl IntoResponse> {
    let reports = ctx
        .repo
        .search(None, None, Some(id), q.status.as_deref(), q.plagiarism_flag, q.page, q.limit)
        .await?;
    Ok(ApiResponse::success(reports))
}

pub async fn list_reports(
    State(ctx): State<SharedAnalysisContext>,
    Query(q): Query<ReportsQuery>,
) -> Result<impl IntoResponse> {
    let reports = ctx
        .repo
        .search(q.work_id, q.assignment_id, q.student_id, q.status.as_deref(), q.plagiarism_flag, q.page, q.limit)
        .await?;
    Ok(ApiResponse::success(reports))
}

pub async fn assignment_stats(State(ctx): State<SharedAnalysisContext>, Path(id): Path<Uuid>) -> Result<impl IntoResponse> {
    let stats = ctx.repo.assignment_stats(id).await?;
    let body = stats
        .map(|(total, analyzed, plagiarized, avg_match)| json!({ "total": total, "analyzed": analyzed, "plagiarized": plagiarized, "avg_match": avg_match }))
        .unwrap_or_else(|| json!({ "total": 0, "analyzed": 0, "plagiarized": 0, "avg_match": 0.0 }));
    Ok(ApiResponse::success(body))
}

pub async fn student_stats(State(ctx): State<SharedAnalysisContext>, Path(id): Path<Uuid>) -> Result<impl IntoResponse> {
    let stats = ctx.repo.student_stats(id).await?;
    let body = stats
        .map(|(total, analyzed, plagiarized, avg_match)| json!({ "total": total, "analyzed": analyzed, "plagiarized": plagiarized, "avg_match": avg_match }))
        .unwrap_or_else(|| json!({ "total": 0, "analyzed": 0, "plagiarized": 0, "avg_match": 0.0 }));
    Ok(ApiResponse::success(body))
}

/// §4.4.3: CSV export alongside the default JSON envelope.
pub async fn export_reports(
    State(ctx): State<SharedAnalysisContext>,
    Query(format): Query<ExportQuery>,
    Query(filters): Query<ReportsQuery>,
) -> Result<axum::response::Response> {
    let reports = ctx
        .repo
        .search(filters.work_id, filters.assignment_id, filters.student_id, filters.status.as_deref(), filters.plagiarism_flag, filters.page, filters.limit.max(1000))
        .await?;

    if format.format == "csv" {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(["work_id", "student_id", "assignment_id", "status", "plagiarism_flag", "match_percentage", "created_at"])
            .map_err(|e| ServiceError::Internal(format!("csv header write failed: {e}")))?;
        for report in &reports {
            writer
                .write_record([
                    report.work_id.to_string(),
                    report.student_id.to_string(),
                    report.assignment_id.to_string(),
                    report.status.clone(),
                    report.plagiarism_flag.to_string(),
                    report.match_percentage.to_string(),
                    report.created_at.to_rfc3339(),
                ])
                .map_err(|e| ServiceError::Internal(format!("csv row write failed: {e}")))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ServiceError::Internal(format!("csv flush failed: {e}")))?;
        Ok((
            [(header::CONTENT_TYPE, "text/csv")],
            bytes,
        )
            .into_response())
    } else {
        Ok(ApiResponse::success(reports).into_response())
    }
}

/// Operator endpoint (§4.4.1 "Retry of failed reports").
pub async fn retry_failed(
    State(ctx): State<SharedAnalysisContext>,
    Query(q): Query<RetryQuery>,
) -> Result<impl IntoResponse> {
    let failed = ctx.repo.failed_reports(q.limit).await?;
    let mut retried = Vec::new();
    for report in failed {
        let reset = ctx.repo.reset_for_retry(report.id).await?;
        match crate::worker::reprocess_report(&ctx, &reset).await {
            Ok(()) => retried.push(json!({ "report_id": reset.id, "status": "processed" })),
            Err(e) => retried.push(json!({ "report_id": reset.id, "status": "failed", "error": e.to_string() })),
        }
    }
    Ok(ApiResponse::success(json!({ "retried": retried })))
}

/// §4.4 "Batch entry point".
pub async fn analyze_batch(
    State(ctx): State<SharedAnalysisContext>,
    Json(req): Json<BatchAnalyzeRequest>,
) -> Result<impl IntoResponse> {
    let batch_size = ctx.config.batch_size;
    let summary = crate::batch::run_batch(&ctx, req.works, batch_size).await;
    Ok(ApiResponse::success(summary))
}

/// §4.4.4: thin proxy to an external word-cloud rendering API.
pub async fn render_wordcloud(
    State(ctx): State<SharedAnalysisContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let report = ctx.repo.find_by_id(id).await?;
    let bytes = ctx.files.get_bytes(&report.file_id).await?;
    if bytes.is_empty() {
        return Err(ServiceError::Validation("file content is empty".into()));
    }
    let text = String::from_utf8_lossy(&bytes).to_string();

    let client = build_client(Duration::from_secs(15))
        .map_err(|e| ServiceError::Internal(format!("failed to build wordcloud client: {e}")))?;
    let policy = RetryPolicy::new(2, 200);
    let url = ctx.wordcloud_url.clone();
    let response = send_with_retry(&policy, || client.post(&url).json(&json!({ "text": text })).send())
        .await
        .map_err(|e| ServiceError::Upstream(format!("wordcloud service call failed: {e}")))?;

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| ServiceError::Upstream(format!("wordcloud response decode failed: {e}")))?;
    Ok(ApiResponse::success(body))
}

pub fn status_filter(status: &str) -> Option<&'static str> {
    ReportStatus::parse(status).map(|s| s.as_str())
}
