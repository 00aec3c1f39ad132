use plagcheck_common::config::{CorsConfig, LoggingConfig, PeerServiceConfig, ServerConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub files_service: PeerServiceConfig,
    #[serde(default)]
    pub works_service: PeerServiceConfig,
    #[serde(default)]
    pub analysis_service: PeerServiceConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

/// Gateway-specific proxy knobs (§4.5 "Proxy behavior"); distinct from
/// `PeerServiceConfig`'s per-backend retry/timeout since the proxy also caps
/// the buffered request body size for retry replay (§9 "Retry-buffered
/// proxy bodies").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

fn default_max_body_bytes() -> usize {
    32 * 1024 * 1024
}
fn default_request_timeout() -> u64 {
    20
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            request_timeout: default_request_timeout(),
        }
    }
}
