use crate::models::StoredFile;
use plagcheck_common::error::{Result, ServiceError};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, file: &StoredFile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stored_files
                (id, original_name, stored_name, extension, size, mime_type, digest,
                 storage_bucket, storage_path, upload_status, uploaded_at, access_count,
                 last_accessed_at, uploaded_by, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(file.id)
        .bind(&file.original_name)
        .bind(&file.stored_name)
        .bind(&file.extension)
        .bind(file.size)
        .bind(&file.mime_type)
        .bind(&file.digest)
        .bind(&file.storage_bucket)
        .bind(&file.storage_path)
        .bind(&file.upload_status)
        .bind(file.uploaded_at)
        .bind(file.access_count)
        .bind(file.last_accessed_at)
        .bind(&file.uploaded_by)
        .bind(&file.metadata)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredFile>> {
        let row = sqlx::query_as::<_, StoredFile>("SELECT * FROM stored_files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Dedup lookup (§4.1 step 4, §8 invariant): earliest surviving row with
    /// matching (digest, size).
    pub async fn find_earliest_survivor_by_digest(
        &self,
        digest: &str,
        size: i64,
    ) -> Result<Option<StoredFile>> {
        let row = sqlx::query_as::<_, StoredFile>(
            r#"
            SELECT * FROM stored_files
            WHERE digest = $1 AND size = $2 AND upload_status = 'uploaded'
            ORDER BY uploaded_at ASC
            LIMIT 1
            "#,
        )
        .bind(digest)
        .bind(size)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_by_digest_and_size(
        &self,
        digest: &str,
        size: i64,
    ) -> Result<Option<StoredFile>> {
        self.find_earliest_survivor_by_digest(digest, size).await
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE stored_files SET upload_status = 'deleted' WHERE id = $1 AND upload_status = 'uploaded'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn hard_delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM stored_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_row_only(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM stored_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn touch_access(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE stored_files SET access_count = access_count + 1, last_accessed_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list(&self, query: Option<&str>, page: i64, limit: i64) -> Result<Vec<StoredFile>> {
        let offset = (page.max(1) - 1) * limit;
        let rows = sqlx::query_as::<_, StoredFile>(
            r#"
            SELECT * FROM stored_files
            WHERE ($1::text IS NULL OR original_name ILIKE '%' || $1 || '%')
            ORDER BY uploaded_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(query)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn stats(&self) -> Result<FileStats> {
        let row: (i64, Option<i64>) = sqlx::query_as(
            "SELECT COUNT(*), SUM(size) FROM stored_files WHERE upload_status = 'uploaded'",
        )
        .fetch_one(&self.pool)
        .await?;
        let by_extension: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT extension, COUNT(*) FROM stored_files
            WHERE upload_status = 'uploaded'
            GROUP BY extension
            ORDER BY COUNT(*) DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(FileStats {
            total_files: row.0,
            total_bytes: row.1.unwrap_or(0),
            by_extension,
        })
    }
}

#[derive(Debug, serde::Serialize)]
pub struct FileStats {
    pub total_files: i64,
    pub total_bytes: i64,
    pub by_extension: Vec<(String, i64)>,
}

pub fn merge_metadata(metadata: Option<Value>) -> Option<Value> {
    metadata
}

pub fn map_db_error(e: sqlx::Error) -> ServiceError {
    ServiceError::Database(e)
}
