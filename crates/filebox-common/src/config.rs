//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: env vars > .env file > config.toml > defaults
//!
//! The loaded [`AppConfig`] is a plain value. Callers wrap it in an `Arc` and
//! hand it to the API state and storage backend explicitly.

use serde::Deserialize;
use std::path::Path;

/// Default upload ceiling: 5 MiB.
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;

/// Load configuration from defaults, an optional config file, `.env`, and the
/// environment.
///
/// When `path` is `None`, a `config.toml` in the working directory is used if
/// present.
pub fn load(path: Option<&Path>) -> Result<AppConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let file_source = match path {
        Some(p) => config::File::from(p).required(true),
        None => config::File::with_name("config").required(false),
    };

    let cfg = config::Config::builder()
        // Defaults
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("storage.backend", "s3")?
        .set_default("storage.endpoint", "")?
        .set_default("storage.access_key", "")?
        .set_default("storage.secret_key", "")?
        .set_default("storage.region", "us-east-1")?
        .set_default("storage.container", "filebox")?
        .set_default("storage.data_dir", "./data/files")?
        .set_default("storage.operation_timeout_secs", 30)?
        .set_default("files.max_file_size_bytes", DEFAULT_MAX_FILE_SIZE_BYTES)?
        .set_default("files.supported_types", vec!["application/pdf"])?
        .set_default("files.max_request_bytes", 64 * 1024 * 1024)? // 64 MiB
        .add_source(file_source)
        // Environment variables (FILEBOX__SERVER__PORT, FILEBOX__FILES__SUPPORTED_TYPES, etc.)
        .add_source(
            config::Environment::with_prefix("FILEBOX")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("files.supported_types"),
        )
        .build()?;

    cfg.try_deserialize()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub files: FilesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Which object store implementation backs the gateway.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// S3 or any S3-compatible service (MinIO, R2, ...).
    S3,
    /// Lite mode: objects live under `data_dir` on the local filesystem.
    Local,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// S3 endpoint URL (e.g., http://localhost:9000 for MinIO).
    /// Leave empty to let the SDK resolve the AWS endpoint for `region`.
    pub endpoint: String,
    /// Static credentials. When empty, the AWS default provider chain is used.
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Bucket (container) holding every file.
    pub container: String,
    /// Base URL used when building the location returned from an upload.
    pub public_url: Option<String>,
    /// Root directory for the local backend.
    pub data_dir: String,
    /// Upper bound on a single backend call.
    pub operation_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesConfig {
    /// Largest accepted upload, in bytes.
    pub max_file_size_bytes: u64,
    /// MIME types accepted by the upload endpoint.
    pub supported_types: Vec<String>,
    /// HTTP body limit applied to the upload route.
    pub max_request_bytes: usize,
}

impl FilesConfig {
    /// Whether `content_type` is on the allow-list (ASCII case-insensitive).
    pub fn is_supported(&self, content_type: &str) -> bool {
        let ct = content_type.trim();
        self.supported_types
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(ct))
    }
}
