//! Worker pool draining the broker consumer (§4.4 "Worker pool" and
//! "Per-message pipeline"). Grounded in the bounded-pool-with-panic-recovery
//! shape implied by §5's "Shared resources"/"Scheduling" notes; no direct
//! teacher precedent for a worker pool, so the shape is new but the
//! retry/backoff discipline matches C1's bucket bootstrap.

use crate::clients::{FileServiceClient, WorkServiceClient};
use crate::detection::{detect, DetectionInput};
use crate::models::PeerComparison;
use crate::repo::ReportRepository;
use chrono::Utc;
use plagcheck_common::broker::{self, BrokerClient};
use plagcheck_common::config::AnalysisConfig;
use plagcheck_common::events::{AnalysisCompletedEvent, ROUTING_KEY_ANALYSIS_COMPLETED};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AnalysisContext {
    pub repo: ReportRepository,
    pub files: FileServiceClient,
    pub works: WorkServiceClient,
    pub broker: Option<BrokerClient>,
    pub config: AnalysisConfig,
    pub wordcloud_url: String,
}

#[derive(Debug, serde::Deserialize)]
struct WorkCreatedPayload {
    work_id: Option<Uuid>,
    file_id: Option<Uuid>,
    student_id: Option<Uuid>,
    assignment_id: Option<Uuid>,
}

pub async fn run_worker_pool(ctx: AnalysisContext) {
    let Some(broker) = ctx.broker.clone() else {
        warn!("⚠️ no broker configured; worker pool idle");
        return;
    };

    let mut consumer = match broker.consume().await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "❌ failed to start broker consumer");
            return;
        }
    };

    let permits = Arc::new(Semaphore::new(ctx.config.max_workers.max(1)));
    info!(workers = ctx.config.max_workers, "✅ worker pool draining broker");

    while let Some(delivery) = broker::next_delivery(&mut consumer).await {
        let delivery = match delivery {
            Ok(d) => d,
            Err(e) => {
                error!(error = %e, "❌ broker delivery error");
                continue;
            }
        };

        let permit = match permits.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => break,
        };
        let ctx = ctx.clone();

        tokio::spawn(async move {
            let _permit = permit;
            // Panic recovery (§4.4 "Worker pool"): a panicking task never
            // takes the pool down, only the one message.
            let outcome = tokio::spawn(process_delivery(ctx, delivery)).await;
            if let Err(join_err) = outcome {
                if join_err.is_panic() {
                    error!("❌ worker task panicked; message left unacked for broker redelivery");
                } else {
                    warn!("worker task was cancelled");
                }
            }
        });
    }
}

async fn process_delivery(ctx: AnalysisContext, delivery: lapin::message::Delivery) {
    let payload: Result<WorkCreatedPayload, _> = serde_json::from_slice(&delivery.data);
    let payload = match payload {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "permanent failure: malformed event payload, dropping");
            let _ = broker::ack(&delivery).await;
            return;
        }
    };

    let (Some(work_id), Some(file_id), Some(student_id), Some(assignment_id)) =
        (payload.work_id, payload.file_id, payload.student_id, payload.assignment_id)
    else {
        warn!("permanent failure: missing required id in event payload, dropping");
        let _ = broker::ack(&delivery).await;
        return;
    };

    match process_work(&ctx, work_id, file_id.to_string(), assignment_id, student_id).await {
        Ok(()) => {
            let _ = broker::ack(&delivery).await;
        }
        Err(ProcessError::Permanent(msg)) => {
            warn!(work_id = %work_id, error = %msg, "permanent pipeline failure, dropping");
            let _ = broker::ack(&delivery).await;
        }
        Err(ProcessError::Transient(msg)) => {
            warn!(work_id = %work_id, error = %msg, "transient failure, requeueing");
            let _ = broker::nack(&delivery, true).await;
        }
    }
}

pub(crate) enum ProcessError {
    Permanent(String),
    Transient(String),
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessError::Permanent(msg) => write!(f, "permanent: {msg}"),
            ProcessError::Transient(msg) => write!(f, "transient: {msg}"),
        }
    }
}

/// §4.4 steps 2-7, shared by both the broker-driven path and the batch endpoint.
pub async fn process_work(
    ctx: &AnalysisContext,
    work_id: Uuid,
    file_id: String,
    assignment_id: Uuid,
    student_id: Uuid,
) -> Result<(), ProcessError> {
    // Step 2: idempotency gate.
    if let Some(existing) = ctx
        .repo
        .find_by_work_id(work_id)
        .await
        .map_err(|e| ProcessError::Transient(e.to_string()))?
    {
        info!(work_id = %work_id, report_id = %existing.id, "skip: already processed");
        return Ok(());
    }

    // Step 3: provisional report.
    let report = match ctx
        .repo
        .insert_provisional(work_id, &file_id, assignment_id, student_id)
        .await
    {
        Ok(r) => r,
        Err(plagcheck_common::error::ServiceError::Conflict(_)) => {
            // Raced with a concurrent delivery; re-enter the idempotency gate.
            return Ok(());
        }
        Err(e) => return Err(ProcessError::Transient(e.to_string())),
    };

    // Step 4: best-effort status side effect.
    if let Err(e) = ctx.works.set_status(&work_id.to_string(), "analyzing").await {
        warn!(work_id = %work_id, error = %e, "work-status side effect failed, ignoring");
    }

    // Step 5: detection.
    match run_detection(ctx, work_id, &file_id, assignment_id, student_id, report.started_at.unwrap_or_else(Utc::now)).await {
        Ok(outcome) => {
            ctx.repo
                .finalize_success(report.id, &outcome)
                .await
                .map_err(|e| ProcessError::Transient(e.to_string()))?;
            publish_completion(ctx, work_id, report.id, "completed", outcome.plagiarism_flag, outcome.original_work_id, outcome.match_percentage).await;
            Ok(())
        }
        Err(e) => {
            let error_context = json!({ "error": e.to_string(), "work_id": work_id, "stage": "detection" });
            ctx.repo
                .finalize_failure(report.id, &error_context)
                .await
                .map_err(|e| ProcessError::Transient(e.to_string()))?;
            publish_completion(ctx, work_id, report.id, "failed", false, None, 0).await;
            Err(ProcessError::Permanent(e))
        }
    }
}

/// §4.4.1 retry path: reruns detection directly against an existing report
/// row. Does not go through `process_work`'s idempotency gate, since that
/// gate would see the row `reset_for_retry` just reset and no-op the retry.
pub async fn reprocess_report(ctx: &AnalysisContext, report: &crate::models::Report) -> Result<(), ProcessError> {
    match run_detection(
        ctx,
        report.work_id,
        &report.file_id,
        report.assignment_id,
        report.student_id,
        report.started_at.unwrap_or_else(Utc::now),
    )
    .await
    {
        Ok(outcome) => {
            ctx.repo
                .finalize_success(report.id, &outcome)
                .await
                .map_err(|e| ProcessError::Transient(e.to_string()))?;
            publish_completion(ctx, report.work_id, report.id, "completed", outcome.plagiarism_flag, outcome.original_work_id, outcome.match_percentage).await;
            Ok(())
        }
        Err(e) => {
            let error_context = json!({ "error": e.to_string(), "work_id": report.work_id, "stage": "detection" });
            ctx.repo
                .finalize_failure(report.id, &error_context)
                .await
                .map_err(|e| ProcessError::Transient(e.to_string()))?;
            publish_completion(ctx, report.work_id, report.id, "failed", false, None, 0).await;
            Err(ProcessError::Permanent(e))
        }
    }
}

async fn run_detection(
    ctx: &AnalysisContext,
    work_id: Uuid,
    file_id: &str,
    assignment_id: Uuid,
    student_id: Uuid,
    started_at: chrono::DateTime<Utc>,
) -> Result<crate::models::DetectionOutcome, String> {
    let current_info = ctx
        .files
        .get_info(file_id)
        .await
        .map_err(|e| format!("resolving current file info failed: {e}"))?;
    let current_digest = current_info
        .get("digest")
        .and_then(Value::as_str)
        .ok_or("current file info missing digest")?
        .to_string();
    let current_size = current_info.get("size").and_then(Value::as_i64).unwrap_or(0);

    let peers_response = ctx
        .works
        .peer_works(&assignment_id.to_string(), &work_id.to_string())
        .await
        .map_err(|e| format!("peer works lookup failed: {e}"))?;

    let peer_list: Vec<Value> = peers_response
        .get("data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut peers = Vec::new();
    for peer in peer_list {
        let Some(peer_work_id) = peer.get("work_id").and_then(Value::as_str).and_then(|s| s.parse().ok()) else {
            continue;
        };
        let Some(peer_student_id) = peer.get("student_id").and_then(Value::as_str).and_then(|s| s.parse().ok()) else {
            continue;
        };
        let Some(peer_file_id) = peer.get("file_id").and_then(Value::as_str) else {
            continue;
        };
        let submitted_at = peer
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        match ctx.files.get_info(peer_file_id).await {
            Ok(info) => {
                if let Some(digest) = info.get("digest").and_then(Value::as_str) {
                    peers.push(PeerComparison {
                        work_id: peer_work_id,
                        student_id: peer_student_id,
                        match_percentage: 0,
                        digest: digest.to_string(),
                        compared_at: Utc::now(),
                        submitted_at,
                    });
                } else {
                    warn!(peer_work_id = %peer_work_id, "peer file info missing digest, skipping");
                }
            }
            Err(e) => {
                warn!(peer_work_id = %peer_work_id, error = %e, "peer file digest lookup failed, skipping");
            }
        }
    }

    let input = DetectionInput {
        work_id,
        student_id,
        current_digest,
        current_size,
        threshold: ctx.config.similarity_threshold,
        started_at,
    };
    Ok(detect(&input, &peers))
}

async fn publish_completion(
    ctx: &AnalysisContext,
    work_id: Uuid,
    report_id: Uuid,
    status: &str,
    plagiarism_flag: bool,
    original_work_id: Option<Uuid>,
    match_percentage: i32,
) {
    let Some(broker) = &ctx.broker else { return };
    let event = AnalysisCompletedEvent {
        work_id,
        report_id,
        status: status.to_string(),
        plagiarism_flag,
        original_work_id,
        match_percentage,
        processing_time_ms: 0,
        completed_at: Utc::now(),
    };
    if let Err(e) = broker.publish(ROUTING_KEY_ANALYSIS_COMPLETED, &event).await {
        warn!(work_id = %work_id, error = %e, "analysis.completed publish failed");
    }
}
