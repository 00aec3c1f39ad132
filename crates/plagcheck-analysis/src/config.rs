use plagcheck_common::config::{AnalysisConfig, DatabaseConfig, LoggingConfig, PeerServiceConfig, RabbitMqConfig, ServerConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub files_service: PeerServiceConfig,
    #[serde(default)]
    pub work_service: PeerServiceConfig,
    #[serde(default)]
    pub rabbitmq: RabbitMqConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub wordcloud_service: PeerServiceConfig,
}
