//! Work registry business logic: student/assignment CRUD and the upload-create
//! saga (§4.2).

use crate::clients::{AnalysisServiceClient, FileServiceClient};
use crate::models::{Assignment, PeerWork, Student, Work, WorkStatus};
use crate::repo::WorkRepository;
use plagcheck_common::broker::BrokerClient;
use plagcheck_common::error::{Result, ServiceError};
use plagcheck_common::events::{WorkCreatedEvent, ROUTING_KEY_WORK_CREATED};
use serde_json::Value;
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct WorkService {
    repo: WorkRepository,
    files: FileServiceClient,
    analysis: AnalysisServiceClient,
    broker: Option<BrokerClient>,
}

impl WorkService {
    pub fn new(
        repo: WorkRepository,
        files: FileServiceClient,
        analysis: AnalysisServiceClient,
        broker: Option<BrokerClient>,
    ) -> Self {
        Self {
            repo,
            files,
            analysis,
            broker,
        }
    }

    pub async fn create_student(&self, display_name: &str, email: &str) -> Result<Student> {
        self.repo.create_student(display_name, email).await
    }

    pub async fn get_student(&self, id: Uuid) -> Result<Student> {
        self.repo.get_student(id).await
    }

    pub async fn delete_student(&self, id: Uuid) -> Result<()> {
        self.repo.delete_student(id).await
    }

    pub async fn create_assignment(&self, title: &str, description: Option<&str>) -> Result<Assignment> {
        self.repo.create_assignment(title, description).await
    }

    pub async fn get_assignment(&self, id: Uuid) -> Result<Assignment> {
        self.repo.get_assignment(id).await
    }

    pub async fn delete_assignment(&self, id: Uuid) -> Result<()> {
        self.repo.delete_assignment(id).await
    }

    /// Metadata-only create (§4.2).
    pub async fn create_work(&self, student_id: Uuid, assignment_id: Uuid) -> Result<Work> {
        self.repo.create_work(student_id, assignment_id).await
    }

    pub async fn get_work(&self, id: Uuid) -> Result<Work> {
        self.repo.get_work(id).await
    }

    pub async fn delete_work(&self, id: Uuid) -> Result<()> {
        let work = self.repo.get_work(id).await?;
        self.repo.delete_work(id).await?;
        if work.has_file() {
            if let Err(e) = self.files.delete(&work.file_id).await {
                warn!(error = %e, file_id = %work.file_id, "failed to release file on work delete");
            }
        }
        Ok(())
    }

    /// Upload-create saga (§4.2): metadata create, forward bytes to C1, attach
    /// file-id, publish `work.created`, then flip status to `analyzing`.
    /// Order is publish-then-flip per the design note in §4.2: this yields
    /// at-least-once analysis instead of a stuck `analyzing` status on broker
    /// outage.
    pub async fn create_work_with_upload(
        &self,
        student_id: Uuid,
        assignment_id: Uuid,
        filename: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<Work> {
        let work = self.repo.create_work(student_id, assignment_id).await?;

        let upload = match self.files.upload(filename, mime, bytes).await {
            Ok(v) => v,
            Err(e) => {
                error!(work_id = %work.id, error = %e, "upload to file service failed, compensating");
                if let Err(cleanup_err) = self.repo.delete_work(work.id).await {
                    warn!(error = %cleanup_err, work_id = %work.id, "compensating work delete failed");
                }
                return Err(ServiceError::Upstream(format!("file upload failed: {e}")));
            }
        };

        let file_id = upload
            .get("file_id")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::Upstream("file service response missing file_id".into()))?
            .to_string();

        let work = match self.repo.attach_file(work.id, &file_id).await {
            Ok(w) => w,
            Err(e) => {
                error!(work_id = %work.id, error = %e, "attaching file_id failed, compensating");
                if let Err(cleanup_err) = self.files.delete(&file_id).await {
                    warn!(error = %cleanup_err, file_id = %file_id, "compensating object delete failed");
                }
                if let Err(cleanup_err) = self.repo.delete_work(work.id).await {
                    warn!(error = %cleanup_err, work_id = %work.id, "compensating work delete failed");
                }
                return Err(e);
            }
        };

        if let Some(broker) = &self.broker {
            let event = WorkCreatedEvent {
                work_id: work.id,
                file_id: file_id.parse().unwrap_or_else(|_| Uuid::nil()),
                student_id,
                assignment_id,
                timestamp: chrono::Utc::now(),
            };
            if let Err(e) = broker.publish(ROUTING_KEY_WORK_CREATED, &event).await {
                warn!(work_id = %work.id, error = %e, "work.created publish failed; work stays recoverable via operator reprocess");
                return Ok(work);
            }
        } else {
            warn!(work_id = %work.id, "no broker configured; skipping work.created publish");
        }

        match self.repo.set_status(work.id, WorkStatus::Analyzing).await {
            Ok(w) => Ok(w),
            Err(e) => {
                warn!(work_id = %work.id, error = %e, "status flip to analyzing failed after publish");
                Ok(work)
            }
        }
    }

    pub async fn set_status(&self, id: Uuid, status: WorkStatus) -> Result<Work> {
        self.repo.set_status(id, status).await
    }

    pub async fn peer_works(
        &self,
        assignment_id: Uuid,
        exclude_work_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<Vec<PeerWork>> {
        self.repo
            .peer_works(assignment_id, exclude_work_id, page, limit)
            .await
    }

    pub async fn works_for_student(&self, student_id: Uuid, page: i64, limit: i64) -> Result<Vec<Work>> {
        self.repo.list_works_for_student(student_id, page, limit).await
    }

    pub async fn works_for_assignment(&self, assignment_id: Uuid, page: i64, limit: i64) -> Result<Vec<Work>> {
        self.repo.list_works_for_assignment(assignment_id, page, limit).await
    }

    /// §4.2.1: reports-by-work passthrough to C4.
    pub async fn reports_for_work(&self, work_id: Uuid) -> Result<Value> {
        self.repo.get_work(work_id).await?;
        self.analysis.report_for_work(&work_id.to_string()).await
    }

    pub async fn assignment_stats(&self, assignment_id: Uuid) -> Result<Value> {
        self.repo.get_assignment(assignment_id).await?;
        self.analysis.assignment_stats(&assignment_id.to_string()).await
    }

    pub async fn student_stats(&self, student_id: Uuid) -> Result<Value> {
        self.repo.get_student(student_id).await?;
        self.analysis.student_stats(&student_id.to_string()).await
    }
}
