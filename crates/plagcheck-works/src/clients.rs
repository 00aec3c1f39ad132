//! Peer-service HTTP clients (§6.1 `services.*`), built on the shared
//! retrying caller in `plagcheck_common::http_client`.

use plagcheck_common::config::PeerServiceConfig;
use plagcheck_common::error::{Result, ServiceError};
use plagcheck_common::http_client::{build_client, send_with_retry, RetryPolicy};
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

#[derive(Clone)]
pub struct FileServiceClient {
    client: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl FileServiceClient {
    pub fn new(config: &PeerServiceConfig) -> Result<Self> {
        let client = build_client(Duration::from_secs(config.timeout))
            .map_err(|e| ServiceError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::new(config.retry_count, config.retry_delay),
        })
    }

    /// Uploads raw bytes to C1, returning the parsed `{file_id, digest, size}` body.
    pub async fn upload(&self, filename: &str, mime: &str, bytes: Vec<u8>) -> Result<Value> {
        let url = format!("{}/files/upload", self.base_url);
        let response = send_with_retry(&self.policy, || {
            let part = multipart::Part::bytes(bytes.clone())
                .file_name(filename.to_string())
                .mime_str(mime)
                .unwrap_or_else(|_| multipart::Part::bytes(bytes.clone()));
            let form = multipart::Form::new().part("file", part);
            self.client.post(&url).multipart(form).send()
        })
        .await
        .map_err(|e| ServiceError::Upstream(format!("file service upload failed: {e}")))?;

        parse_envelope(response).await
    }

    pub async fn get_info(&self, file_id: &str) -> Result<Value> {
        let url = format!("{}/files/{}/info", self.base_url, file_id);
        let response = send_with_retry(&self.policy, || self.client.get(&url).send())
            .await
            .map_err(|e| ServiceError::Upstream(format!("file service get_info failed: {e}")))?;
        parse_envelope(response).await
    }

    pub async fn delete(&self, file_id: &str) -> Result<()> {
        let url = format!("{}/files/{}", self.base_url, file_id);
        let response = send_with_retry(&self.policy, || self.client.delete(&url).send())
            .await
            .map_err(|e| ServiceError::Upstream(format!("file service delete failed: {e}")))?;
        if !response.status().is_success() {
            return Err(ServiceError::Upstream(format!(
                "file service delete returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct AnalysisServiceClient {
    client: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl AnalysisServiceClient {
    pub fn new(config: &PeerServiceConfig) -> Result<Self> {
        let client = build_client(Duration::from_secs(config.timeout))
            .map_err(|e| ServiceError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::new(config.retry_count, config.retry_delay),
        })
    }

    /// §4.2.1: thin passthrough to C4's `GET /reports/work/{id}`. A 404 upstream
    /// becomes `{report: null}` here rather than bubbling as an error.
    pub async fn report_for_work(&self, work_id: &str) -> Result<Value> {
        let url = format!("{}/reports/work/{}", self.base_url, work_id);
        let response = send_with_retry(&self.policy, || self.client.get(&url).send())
            .await
            .map_err(|e| ServiceError::Upstream(format!("analysis service call failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(serde_json::json!({ "report": null }));
        }
        parse_envelope(response).await
    }

    pub async fn assignment_stats(&self, assignment_id: &str) -> Result<Value> {
        let url = format!("{}/assignments/{}/stats", self.base_url, assignment_id);
        let response = send_with_retry(&self.policy, || self.client.get(&url).send())
            .await
            .map_err(|e| ServiceError::Upstream(format!("analysis service call failed: {e}")))?;
        parse_envelope(response).await
    }

    pub async fn student_stats(&self, student_id: &str) -> Result<Value> {
        let url = format!("{}/students/{}/stats", self.base_url, student_id);
        let response = send_with_retry(&self.policy, || self.client.get(&url).send())
            .await
            .map_err(|e| ServiceError::Upstream(format!("analysis service call failed: {e}")))?;
        parse_envelope(response).await
    }
}

async fn parse_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(ServiceError::Upstream(format!(
            "peer service returned {}",
            response.status()
        )));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ServiceError::Upstream(format!("failed to decode peer response: {e}")))
}
