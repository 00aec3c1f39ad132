//! Broker envelope payloads (§4.3). JSON-encoded UTF-8 on a single direct
//! exchange, routed by these two keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ROUTING_KEY_WORK_CREATED: &str = "work.created";
pub const ROUTING_KEY_ANALYSIS_COMPLETED: &str = "analysis.completed";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkCreatedEvent {
    pub work_id: Uuid,
    pub file_id: Uuid,
    pub student_id: Uuid,
    pub assignment_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisCompletedEvent {
    pub work_id: Uuid,
    pub report_id: Uuid,
    pub status: String,
    pub plagiarism_flag: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_work_id: Option<Uuid>,
    pub match_percentage: i32,
    pub processing_time_ms: i64,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_created_round_trips_through_json() {
        let ev = WorkCreatedEvent {
            work_id: Uuid::new_v4(),
            file_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            assignment_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_vec(&ev).unwrap();
        let back: WorkCreatedEvent = serde_json::from_slice(&json).unwrap();
        assert_eq!(ev.work_id, back.work_id);
        assert_eq!(ev.file_id, back.file_id);
    }

    #[test]
    fn analysis_completed_omits_original_work_id_when_absent() {
        let ev = AnalysisCompletedEvent {
            work_id: Uuid::new_v4(),
            report_id: Uuid::new_v4(),
            status: "completed".into(),
            plagiarism_flag: false,
            original_work_id: None,
            match_percentage: 0,
            processing_time_ms: 12,
            completed_at: Utc::now(),
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(!json.contains("original_work_id"));
    }
}
