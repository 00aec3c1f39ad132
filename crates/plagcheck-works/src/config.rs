use plagcheck_common::config::{DatabaseConfig, LoggingConfig, PeerServiceConfig, RabbitMqConfig, ServerConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub files_service: PeerServiceConfig,
    #[serde(default)]
    pub analysis_service: PeerServiceConfig,
    #[serde(default)]
    pub rabbitmq: RabbitMqConfig,
}
