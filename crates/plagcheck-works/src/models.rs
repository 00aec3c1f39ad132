use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel stored in `works.file_id` before the upload phase of the saga attaches a real file.
pub const PENDING_FILE_ID: &str = "pending";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkStatus {
    Uploaded,
    Analyzing,
    Analyzed,
    Failed,
}

impl WorkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::Uploaded => "uploaded",
            WorkStatus::Analyzing => "analyzing",
            WorkStatus::Analyzed => "analyzed",
            WorkStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(WorkStatus::Uploaded),
            "analyzing" => Some(WorkStatus::Analyzing),
            "analyzed" => Some(WorkStatus::Analyzed),
            "failed" => Some(WorkStatus::Failed),
            _ => None,
        }
    }

    /// §4.2 status machine: uploaded -> analyzing -> analyzed; any -> failed; failed -> analyzing on retry.
    pub fn can_transition_to(&self, next: WorkStatus) -> bool {
        use WorkStatus::*;
        match (*self, next) {
            (_, Failed) => true,
            (Uploaded, Analyzing) => true,
            (Analyzing, Analyzed) => true,
            (Failed, Analyzing) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Work {
    pub id: Uuid,
    pub student_id: Uuid,
    pub assignment_id: Uuid,
    pub file_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Work {
    pub fn has_file(&self) -> bool {
        self.file_id != PENDING_FILE_ID
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAssignmentRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWorkRequest {
    pub student_id: Uuid,
    pub assignment_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PeerWork {
    pub work_id: Uuid,
    pub student_id: Uuid,
    pub file_id: String,
    pub created_at: DateTime<Utc>,
}
