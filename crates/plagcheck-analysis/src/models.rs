use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Processing => "processing",
            ReportStatus::Completed => "completed",
            ReportStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReportStatus::Pending),
            "processing" => Some(ReportStatus::Processing),
            "completed" => Some(ReportStatus::Completed),
            "failed" => Some(ReportStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    pub id: Uuid,
    pub work_id: Uuid,
    pub file_id: String,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    pub status: String,
    pub plagiarism_flag: bool,
    pub original_work_id: Option<Uuid>,
    pub match_percentage: i32,
    pub file_digest: Option<String>,
    pub compared_digests: Value,
    pub details: Value,
    pub processing_time_ms: Option<i64>,
    pub compared_files_count: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PeerComparison {
    pub work_id: Uuid,
    pub student_id: Uuid,
    pub match_percentage: i32,
    pub digest: String,
    pub compared_at: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectionOutcome {
    pub plagiarism_flag: bool,
    pub original_work_id: Option<Uuid>,
    pub match_percentage: i32,
    pub compared_digests: Vec<String>,
    pub compared_files_count: i32,
    pub details: Value,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub work_id: Uuid,
    pub file_id: String,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct BatchAnalyzeRequest {
    pub works: Vec<AnalyzeRequest>,
}

#[derive(Debug, Serialize)]
pub struct BatchAnalyzeSummary {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub results: Vec<Value>,
}
