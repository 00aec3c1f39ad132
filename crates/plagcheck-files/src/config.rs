use plagcheck_common::config::{DatabaseConfig, LoggingConfig, MinioConfig, ServerConfig, StorageConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub minio: MinioConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_size")]
    pub max_size_bytes: u64,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    #[serde(default = "default_true")]
    pub dedup_enabled: bool,
    #[serde(default = "default_hash_algorithm")]
    pub hash_algorithm: String,
}

fn default_max_size() -> u64 {
    50 * 1024 * 1024 // 50MB
}

fn default_allowed_extensions() -> Vec<String> {
    ["txt", "pdf", "doc", "docx", "zip", "py", "java", "c", "cpp", "rs", "go", "js", "ts"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_hash_algorithm() -> String {
    "sha256".to_string()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_size(),
            allowed_extensions: default_allowed_extensions(),
            dedup_enabled: default_true(),
            hash_algorithm: default_hash_algorithm(),
        }
    }
}
