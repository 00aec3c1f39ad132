//! Ingest pipeline (§4.1): validate, digest, dedup, store, persist, with a
//! compensating object delete if the post-write DB insert fails.

use crate::config::FileServiceConfig;
use crate::digest::HashAlgorithm;
use crate::models::{PutResult, StoredFile, UploadStatus};
use crate::repo::{FileRepository, FileStats};
use crate::storage::ObjectStore;
use chrono::Utc;
use plagcheck_common::error::{Result, ServiceError};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct FileService {
    repo: FileRepository,
    store: ObjectStore,
    config: FileServiceConfig,
}

pub struct PutRequest {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub uploaded_by: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl FileService {
    pub fn new(repo: FileRepository, store: ObjectStore, config: FileServiceConfig) -> Self {
        Self { repo, store, config }
    }

    fn extension_of(name: &str) -> String {
        name.rsplit('.')
            .next()
            .filter(|ext| *ext != name)
            .unwrap_or("")
            .to_ascii_lowercase()
    }

    fn validate(&self, req: &PutRequest) -> Result<String> {
        if req.bytes.len() as u64 > self.config.upload.max_size_bytes {
            return Err(ServiceError::PayloadTooLarge(format!(
                "file size {} exceeds limit {}",
                req.bytes.len(),
                self.config.upload.max_size_bytes
            )));
        }
        let extension = Self::extension_of(&req.original_name);
        if !self.config.upload.allowed_extensions.iter().any(|e| e == &extension) {
            return Err(ServiceError::UnsupportedMediaType(format!(
                "extension '{extension}' is not allowed"
            )));
        }
        Ok(extension)
    }

    fn stored_name(extension: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let short = Uuid::new_v4().to_string();
        let short = &short[..8];
        if extension.is_empty() {
            format!("file_{nanos}_{short}")
        } else {
            format!("file_{nanos}_{short}.{extension}")
        }
    }

    fn sharded_path(stored_name: &str) -> String {
        let now = Utc::now();
        format!(
            "{:04}/{:02}/{:02}/{}",
            now.format("%Y"),
            now.format("%m"),
            now.format("%d"),
            stored_name
        )
    }

    #[instrument(skip(self, req), fields(original_name = %req.original_name))]
    pub async fn put(&self, req: PutRequest) -> Result<PutResult> {
        let extension = self.validate(&req)?;
        let algorithm = HashAlgorithm::parse(&self.config.upload.hash_algorithm);
        let digest = algorithm.digest(&req.bytes);
        let size = req.bytes.len() as i64;

        if self.config.upload.dedup_enabled {
            if let Some(existing) = self.repo.find_earliest_survivor_by_digest(&digest, size).await? {
                return Ok(PutResult {
                    file_id: existing.id,
                    digest: existing.digest,
                    size: existing.size,
                    deduplicated: true,
                });
            }
        }

        let stored_name = Self::stored_name(&extension);
        let storage_path = Self::sharded_path(&stored_name);

        self.store.write(&storage_path, req.bytes).await?;

        let file = StoredFile {
            id: Uuid::new_v4(),
            original_name: req.original_name,
            stored_name,
            extension,
            size,
            mime_type: req.mime_type,
            digest: digest.clone(),
            storage_bucket: self.store.bucket().to_string(),
            storage_path: storage_path.clone(),
            upload_status: UploadStatus::Uploaded.as_str().to_string(),
            uploaded_at: Utc::now(),
            access_count: 0,
            last_accessed_at: None,
            uploaded_by: req.uploaded_by,
            metadata: req.metadata,
        };

        if let Err(db_err) = self.repo.insert(&file).await {
            error!(error = %db_err, "DB insert failed after object write, compensating with delete");
            if let Err(cleanup_err) = self.store.delete(&storage_path).await {
                warn!(error = %cleanup_err, path = %storage_path, "compensating delete also failed, object orphaned");
            }
            return Err(db_err);
        }

        Ok(PutResult {
            file_id: file.id,
            digest,
            size,
            deduplicated: false,
        })
    }

    pub async fn get_info(&self, id: Uuid) -> Result<StoredFile> {
        self.repo
            .find_by_id(id)
            .await?
            .filter(|f| !f.is_deleted())
            .ok_or_else(|| ServiceError::NotFound(format!("file {id} not found")))
    }

    pub async fn get_bytes(&self, id: Uuid) -> Result<(StoredFile, Vec<u8>)> {
        let file = self.get_info(id).await?;
        let bytes = self.store.read(&file.storage_path).await?;
        self.repo.touch_access(id).await?;
        Ok((file, bytes))
    }

    /// §4.1 contract: `presigned-url(file-id, ttl) -> url`.
    pub async fn presigned_url(&self, id: Uuid, expires_in: std::time::Duration) -> Result<String> {
        let file = self.get_info(id).await?;
        self.store.presign_read(&file.storage_path, expires_in).await
    }

    pub async fn get_by_digest(&self, digest: &str, size: i64) -> Result<StoredFile> {
        self.repo
            .find_by_digest_and_size(digest, size)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("no file with digest {digest}")))
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let file = self.get_info(id).await?;
        let removed = self.repo.soft_delete(id).await?;
        if !removed {
            return Err(ServiceError::Gone(format!("file {id} already deleted")));
        }
        if let Err(e) = self.store.delete(&file.storage_path).await {
            warn!(error = %e, path = %file.storage_path, "object delete failed after soft delete");
        }
        Ok(())
    }

    pub async fn list(&self, query: Option<&str>, page: i64, limit: i64) -> Result<Vec<StoredFile>> {
        self.repo.list(query, page, limit).await
    }

    pub async fn stats(&self) -> Result<FileStats> {
        self.repo.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_of_handles_dotless_and_dotted_names() {
        assert_eq!(FileService::extension_of("report.PDF"), "pdf");
        assert_eq!(FileService::extension_of("Makefile"), "");
        assert_eq!(FileService::extension_of("archive.tar.gz"), "gz");
    }

    #[test]
    fn stored_name_keeps_extension_when_present() {
        let name = FileService::stored_name("rs");
        assert!(name.ends_with(".rs"));
        let name = FileService::stored_name("");
        assert!(!name.contains('.'));
    }

    #[test]
    fn sharded_path_embeds_stored_name() {
        let path = FileService::sharded_path("file_1_abcd.rs");
        assert!(path.ends_with("file_1_abcd.rs"));
        assert_eq!(path.matches('/').count(), 3);
    }
}
