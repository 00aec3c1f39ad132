//! Object backend abstraction over `opendal` (§4.1.1), with bucket-bootstrap
//! resilience (§4.1 "Bucket bootstrap", §9 "Bucket bootstrap resilience").
//!
//! Grounded on `examples/smithclay-otlp2parquet/crates/otlp2parquet-runtime/src/opendal_storage.rs`.

use crate::config::{FileServiceConfig};
use opendal::{services, Operator};
use plagcheck_common::config::{MinioConfig, StorageConfig};
use plagcheck_common::error::{Result, ServiceError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const BOOTSTRAP_MAX_ATTEMPTS: u32 = 5;
const BOOTSTRAP_BASE_DELAY_MS: u64 = 200;

#[derive(Clone)]
pub struct ObjectStore {
    operator: Operator,
    bucket: String,
    ensured: Arc<AtomicBool>,
}

impl ObjectStore {
    pub fn new_s3(storage: &StorageConfig, minio: &MinioConfig) -> Result<Self> {
        let scheme = if minio.use_ssl { "https" } else { "http" };
        let endpoint = format!("{scheme}://{}", minio.endpoint);
        let builder = services::S3::default()
            .bucket(&storage.bucket_name)
            .region(&storage.region)
            .endpoint(&endpoint)
            .access_key_id(&minio.access_key)
            .secret_access_key(&minio.secret_key);
        let operator = Operator::new(builder)
            .map_err(|e| ServiceError::Internal(format!("opendal s3 builder failed: {e}")))?
            .finish();
        Ok(Self {
            operator,
            bucket: storage.bucket_name.clone(),
            ensured: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn new_fs(root: &str) -> Result<Self> {
        let builder = services::Fs::default().root(root);
        let operator = Operator::new(builder)
            .map_err(|e| ServiceError::Internal(format!("opendal fs builder failed: {e}")))?
            .finish();
        Ok(Self {
            operator,
            bucket: "local".to_string(),
            ensured: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn from_config(config: &FileServiceConfig) -> Result<Self> {
        match config.storage.provider.as_str() {
            "fs" | "filesystem" => Self::new_fs(&config.storage.bucket_name),
            _ => Self::new_s3(&config.storage, &config.minio),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Best-effort startup check. Never fails the process: on repeated
    /// failure it just leaves `ensured` false and callers retry lazily on
    /// first request (§4.1 "Bucket bootstrap").
    pub async fn try_ensure_bucket(&self) {
        if self.ensured.load(Ordering::Acquire) {
            return;
        }
        for attempt in 1..=BOOTSTRAP_MAX_ATTEMPTS {
            match self.operator.check().await {
                Ok(()) => {
                    self.ensured.store(true, Ordering::Release);
                    info!("✅ object backend reachable, bucket ensured");
                    return;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "⚠️ object backend not ready yet");
                    tokio::time::sleep(Duration::from_millis(
                        BOOTSTRAP_BASE_DELAY_MS * attempt as u64,
                    ))
                    .await;
                }
            }
        }
        warn!("⚠️ object backend still not reachable after bootstrap attempts; will retry lazily");
    }

    async fn ensure_ready(&self) -> Result<()> {
        if self.ensured.load(Ordering::Acquire) {
            return Ok(());
        }
        self.operator.check().await.map_err(|e| {
            ServiceError::ServiceUnavailable(format!("object backend not ready: {e}"))
        })?;
        self.ensured.store(true, Ordering::Release);
        Ok(())
    }

    pub async fn write(&self, path: &str, data: Vec<u8>) -> Result<()> {
        self.ensure_ready().await?;
        self.operator
            .write(path, data)
            .await
            .map_err(map_opendal_err)?;
        debug!(path, "🔧 wrote object");
        Ok(())
    }

    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.ensure_ready().await?;
        let buf = self.operator.read(path).await.map_err(map_opendal_err)?;
        Ok(buf.to_vec())
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.ensure_ready().await?;
        self.operator.delete(path).await.map_err(map_opendal_err)?;
        Ok(())
    }

    /// §4.1 "presigned-url(file-id, ttl) -> url". Falls back to reporting
    /// the backend as unavailable for schemes (e.g. plain filesystem) that
    /// cannot presign, since there's no durable credential to embed.
    pub async fn presign_read(&self, path: &str, expires_in: Duration) -> Result<String> {
        self.ensure_ready().await?;
        let signed = self
            .operator
            .presign_read(path, expires_in)
            .await
            .map_err(|e| ServiceError::ServiceUnavailable(format!("object backend cannot presign: {e}")))?;
        Ok(signed.uri().to_string())
    }
}

fn map_opendal_err(e: opendal::Error) -> ServiceError {
    match e.kind() {
        opendal::ErrorKind::NotFound => ServiceError::NotFound(format!("object not found: {e}")),
        _ => ServiceError::Upstream(format!("object backend error: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fs_backend_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new_fs(dir.path().to_str().unwrap()).unwrap();
        store.write("a/b.txt", b"hello\n".to_vec()).await.unwrap();
        let data = store.read("a/b.txt").await.unwrap();
        assert_eq!(data, b"hello\n".to_vec());
    }

    #[tokio::test]
    async fn fs_backend_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new_fs(dir.path().to_str().unwrap()).unwrap();
        let err = store.read("missing.txt").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn fs_backend_delete_then_read_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new_fs(dir.path().to_str().unwrap()).unwrap();
        store.write("x.txt", b"data".to_vec()).await.unwrap();
        store.delete("x.txt").await.unwrap();
        assert!(store.read("x.txt").await.is_err());
    }
}
