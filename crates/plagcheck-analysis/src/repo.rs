use crate::models::{DetectionOutcome, Report, ReportStatus};
use chrono::Utc;
use plagcheck_common::error::{Result, ServiceError};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// §4.4 step 2, §5 "Ordering guarantees": read-your-writes idempotency gate.
    pub async fn find_by_work_id(&self, work_id: Uuid) -> Result<Option<Report>> {
        let row = sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE work_id = $1")
            .bind(work_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Report> {
        sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("report {id} not found")))
    }

    /// §4.4 step 3: provisional insert. Relies on the unique `work_id`
    /// constraint (§5) to reject a concurrent delivery racing this one; the
    /// caller re-enters the idempotency gate on that conflict.
    pub async fn insert_provisional(
        &self,
        work_id: Uuid,
        file_id: &str,
        assignment_id: Uuid,
        student_id: Uuid,
    ) -> Result<Report> {
        let report = sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports
                (id, work_id, file_id, assignment_id, student_id, status, plagiarism_flag,
                 match_percentage, compared_digests, details, compared_files_count,
                 created_at, started_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, false, 0, '[]'::jsonb, '{}'::jsonb, 0, NOW(), NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(work_id)
        .bind(file_id)
        .bind(assignment_id)
        .bind(student_id)
        .bind(ReportStatus::Processing.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err)
                if db_err.kind() == sqlx::error::ErrorKind::UniqueViolation =>
            {
                ServiceError::Conflict(format!("report for work {work_id} already exists"))
            }
            _ => ServiceError::Database(e),
        })?;
        Ok(report)
    }

    /// §4.4 step 6 success path, plus the §4.4.2 stats upsert, in one transaction.
    pub async fn finalize_success(&self, report_id: Uuid, outcome: &DetectionOutcome) -> Result<Report> {
        let mut tx = self.pool.begin().await?;
        let completed_at = Utc::now();

        let report = sqlx::query_as::<_, Report>(
            r#"
            UPDATE reports SET
                status = $2,
                plagiarism_flag = $3,
                original_work_id = $4,
                match_percentage = $5,
                compared_digests = $6,
                details = $7,
                compared_files_count = $8,
                processing_time_ms = EXTRACT(EPOCH FROM (NOW() - started_at)) * 1000,
                completed_at = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(report_id)
        .bind(ReportStatus::Completed.as_str())
        .bind(outcome.plagiarism_flag)
        .bind(outcome.original_work_id)
        .bind(outcome.match_percentage)
        .bind(serde_json::to_value(&outcome.compared_digests).unwrap_or(Value::Array(vec![])))
        .bind(&outcome.details)
        .bind(outcome.compared_files_count)
        .bind(completed_at)
        .fetch_one(&mut *tx)
        .await?;

        upsert_stats(&mut tx, report.assignment_id, report.student_id, true, outcome.plagiarism_flag, outcome.match_percentage).await?;

        tx.commit().await?;
        Ok(report)
    }

    /// §4.4 step 6 failure path: flip to failed, preserve error context in `details`.
    pub async fn finalize_failure(&self, report_id: Uuid, error_context: &Value) -> Result<Report> {
        let mut tx = self.pool.begin().await?;

        let report = sqlx::query_as::<_, Report>(
            r#"
            UPDATE reports SET
                status = $2,
                details = $3,
                processing_time_ms = EXTRACT(EPOCH FROM (NOW() - started_at)) * 1000,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(report_id)
        .bind(ReportStatus::Failed.as_str())
        .bind(error_context)
        .fetch_one(&mut *tx)
        .await?;

        upsert_stats(&mut tx, report.assignment_id, report.student_id, false, false, 0).await?;

        tx.commit().await?;
        Ok(report)
    }

    pub async fn reset_for_retry(&self, report_id: Uuid) -> Result<Report> {
        let report = sqlx::query_as::<_, Report>(
            "UPDATE reports SET status = $2, started_at = NOW(), updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(report_id)
        .bind(ReportStatus::Processing.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(report)
    }

    pub async fn failed_reports(&self, limit: i64) -> Result<Vec<Report>> {
        let rows = sqlx::query_as::<_, Report>(
            "SELECT * FROM reports WHERE status = $1 ORDER BY updated_at ASC LIMIT $2",
        )
        .bind(ReportStatus::Failed.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn search(
        &self,
        work_id: Option<Uuid>,
        assignment_id: Option<Uuid>,
        student_id: Option<Uuid>,
        status: Option<&str>,
        plagiarism_flag: Option<bool>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<Report>> {
        let offset = (page.max(1) - 1) * limit;
        let rows = sqlx::query_as::<_, Report>(
            r#"
            SELECT * FROM reports
            WHERE ($1::uuid IS NULL OR work_id = $1)
              AND ($2::uuid IS NULL OR assignment_id = $2)
              AND ($3::uuid IS NULL OR student_id = $3)
              AND ($4::text IS NULL OR status = $4)
              AND ($5::boolean IS NULL OR plagiarism_flag = $5)
            ORDER BY created_at DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(work_id)
        .bind(assignment_id)
        .bind(student_id)
        .bind(status)
        .bind(plagiarism_flag)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn assignment_stats(&self, assignment_id: Uuid) -> Result<Option<(i64, i64, i64, f64)>> {
        let row: Option<(i64, i64, i64, f64)> = sqlx::query_as(
            "SELECT total, analyzed, plagiarized, avg_match FROM assignment_stats WHERE assignment_id = $1",
        )
        .bind(assignment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn student_stats(&self, student_id: Uuid) -> Result<Option<(i64, i64, i64, f64)>> {
        let row: Option<(i64, i64, i64, f64)> = sqlx::query_as(
            "SELECT total, analyzed, plagiarized, avg_match FROM student_stats WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

/// §4.4.2: upsert both aggregate tables inside the caller's transaction.
async fn upsert_stats(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    assignment_id: Uuid,
    student_id: Uuid,
    analyzed: bool,
    plagiarized: bool,
    match_percentage: i32,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO assignment_stats (assignment_id, total, analyzed, plagiarized, avg_match)
        VALUES ($1, 1, $2::int, $3::int, $4)
        ON CONFLICT (assignment_id) DO UPDATE SET
            total = assignment_stats.total + 1,
            analyzed = assignment_stats.analyzed + $2::int,
            plagiarized = assignment_stats.plagiarized + $3::int,
            avg_match = CASE WHEN $2::int = 1
                THEN (assignment_stats.avg_match * assignment_stats.analyzed + $4) / (assignment_stats.analyzed + 1)
                ELSE assignment_stats.avg_match
            END
        "#,
    )
    .bind(assignment_id)
    .bind(analyzed as i32)
    .bind(plagiarized as i32)
    .bind(match_percentage as f64)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO student_stats (student_id, total, analyzed, plagiarized, avg_match)
        VALUES ($1, 1, $2::int, $3::int, $4)
        ON CONFLICT (student_id) DO UPDATE SET
            total = student_stats.total + 1,
            analyzed = student_stats.analyzed + $2::int,
            plagiarized = student_stats.plagiarized + $3::int,
            avg_match = CASE WHEN $2::int = 1
                THEN (student_stats.avg_match * student_stats.analyzed + $4) / (student_stats.analyzed + 1)
                ELSE student_stats.avg_match
            END
        "#,
    )
    .bind(student_id)
    .bind(analyzed as i32)
    .bind(plagiarized as i32)
    .bind(match_percentage as f64)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
