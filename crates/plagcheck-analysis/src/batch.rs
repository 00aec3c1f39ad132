//! Synchronous batch entry point (§4.4 "Batch entry point"): bypasses the
//! broker but reuses the same idempotency gate and detection core as the
//! worker pool.

use crate::models::{AnalyzeRequest, BatchAnalyzeSummary};
use crate::worker::{process_work, AnalysisContext};
use futures::stream::{self, StreamExt};
use serde_json::json;

const SUB_BATCH_CONCURRENCY: usize = 5;

pub async fn run_batch(ctx: &AnalysisContext, works: Vec<AnalyzeRequest>, batch_size: usize) -> BatchAnalyzeSummary {
    let total = works.len();
    let works: Vec<_> = works.into_iter().take(batch_size).collect();

    let results: Vec<_> = stream::iter(works.into_iter().map(|req| {
        let ctx = ctx.clone();
        async move {
            let outcome = process_work(&ctx, req.work_id, req.file_id.clone(), req.assignment_id, req.student_id).await;
            match outcome {
                Ok(()) => json!({ "work_id": req.work_id, "status": "processed" }),
                Err(e) => json!({ "work_id": req.work_id, "status": "failed", "error": e.to_string() }),
            }
        }
    }))
    .buffer_unordered(SUB_BATCH_CONCURRENCY)
    .collect()
    .await;

    let failed = results
        .iter()
        .filter(|r| r.get("status").and_then(|s| s.as_str()) == Some("failed"))
        .count();
    let processed = results.len() - failed;

    BatchAnalyzeSummary {
        total,
        processed,
        failed,
        results,
    }
}
