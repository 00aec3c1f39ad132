//! Peer-service HTTP clients for the analysis engine (§4.4.1, §6.1 `services.*`).

use plagcheck_common::config::PeerServiceConfig;
use plagcheck_common::error::{Result, ServiceError};
use plagcheck_common::http_client::{build_client, send_with_retry, RetryPolicy};
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

    pub async fn get_info(&self, file_id: &str) -> Result<Value> {
        let url = format!("{}/files/{}/info", self.base_url, file_id);
        let response = send_with_retry(&self.policy, || self.client.get(&url).send())
            .await
            .map_err(|e| ServiceError::Upstream(format!("file service get_info failed: {e}")))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(format!("file {file_id} not found")));
        }
        parse_envelope(response).await
    }

    pub async fn get_bytes(&self, file_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/files/{}", self.base_url, file_id);
        let response = send_with_retry(&self.policy, || self.client.get(&url).send())
            .await
            .map_err(|e| ServiceError::Upstream(format!("file service get_bytes failed: {e}")))?;
        if !response.status().is_success() {
            return Err(ServiceError::Upstream(format!(
                "file service returned {}",
                response.status()
            )));
        }
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| ServiceError::Upstream(format!("failed reading file bytes: {e}")))
    }
}

#[derive(Clone)]
pub struct WorkServiceClient {
    client: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl WorkServiceClient {
    pub fn new(config: &PeerServiceConfig) -> Result<Self> {
        let client = build_client(Duration::from_secs(config.timeout))
            .map_err(|e| ServiceError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::new(config.retry_count, config.retry_delay),
        })
    }

    /// §4.4.1b: peer works in the same assignment, excluding the current one.
    pub async fn peer_works(&self, assignment_id: &str, exclude_work_id: &str) -> Result<Value> {
        let url = format!(
            "{}/works/{}/peers?assignment_id={}&limit=500",
            self.base_url, exclude_work_id, assignment_id
        );
        let response = send_with_retry(&self.policy, || self.client.get(&url).send())
            .await
            .map_err(|e| ServiceError::Upstream(format!("work service peer_works failed: {e}")))?;
        parse_envelope(response).await
    }

    /// §4.4 step 4: best-effort status side effect. Failure is logged by the
    /// caller and intentionally ignored here via the `Result` it returns.
    pub async fn set_status(&self, work_id: &str, status: &str) -> Result<()> {
        let url = format!("{}/works/{}/status", self.base_url, work_id);
        let response = send_with_retry(&self.policy, || {
            self.client.put(&url).json(&serde_json::json!({ "status": status })).send()
        })
        .await
        .map_err(|e| ServiceError::Upstream(format!("work service set_status failed: {e}")))?;
        if !response.status().is_success() {
            return Err(ServiceError::Upstream(format!(
                "work service set_status returned {}",
                response.status()
            )));
        }
        Ok(())
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
