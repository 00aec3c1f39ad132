use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploaded,
    Deleted,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Uploaded => "uploaded",
            UploadStatus::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "deleted" => UploadStatus::Deleted,
            _ => UploadStatus::Uploaded,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredFile {
    pub id: Uuid,
    pub original_name: String,
    pub stored_name: String,
    pub extension: String,
    pub size: i64,
    pub mime_type: String,
    pub digest: String,
    pub storage_bucket: String,
    pub storage_path: String,
    pub upload_status: String,
    pub uploaded_at: DateTime<Utc>,
    pub access_count: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub uploaded_by: Option<String>,
    pub metadata: Option<Value>,
}

impl StoredFile {
    pub fn is_deleted(&self) -> bool {
        self.upload_status == UploadStatus::Deleted.as_str()
    }
}

/// Result of a successful `put` (§4.1 contract), whether freshly written or deduplicated.
#[derive(Debug, Clone, Serialize)]
pub struct PutResult {
    pub file_id: Uuid,
    pub digest: String,
    pub size: i64,
    pub deduplicated: bool,
}
