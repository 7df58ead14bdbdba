use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_PIPELINE_URL: &str = "http://127.0.0.1:5112/pipeline";
pub const DEFAULT_ADHOC_URL: &str = "http://127.0.0.1:5006/scan";
pub const DEFAULT_ADHOC_TIMEOUT_SECS: u64 = 120;

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub discovery: DiscoveryConfig,
    pub scan: ScanConfig,
    pub queue: QueueSettings,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Postgres,
    /// Ephemeral in-process store; everything is lost on restart.
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub url: Url,
    pub timeout_secs: Option<u64>,
}

impl EndpointConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Backend used by batch workers.
    pub pipeline: EndpointConfig,
    /// Backend used by the synchronous ad-hoc scanner.
    pub adhoc: EndpointConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Targets per batch job.
    pub group_size: usize,
    /// Targets between progress refreshes inside a batch.
    pub sub_batch_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_attempts: u16,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    pub workers: usize,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Renderer executable.
    pub program: String,
    /// Script passed as the renderer's first argument.
    pub script: Option<PathBuf>,
    /// Logo handed to the renderer as `--logo=<path>`.
    pub branding: Option<PathBuf>,
    /// Scratch area for serialized results and rendered output.
    pub work_dir: PathBuf,
    /// Root of the publicly served tree; reports land in `reports/` below it.
    pub public_dir: PathBuf,
    pub public_base_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: Option<String>,
    pub json: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
