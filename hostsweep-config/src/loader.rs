use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

use super::models::{
    Config, ConfigMetadata, DEFAULT_ADHOC_TIMEOUT_SECS, DEFAULT_ADHOC_URL,
    DEFAULT_PIPELINE_URL, DatabaseBackend, DatabaseConfig, DiscoveryConfig,
    EndpointConfig, LoggingConfig, QueueSettings, ReportConfig, RetrySettings,
    ScanConfig, ServerConfig,
};
use super::sources::{EnvConfig, FileConfig, FileEndpointConfig};
use super::validation::{self, ConfigGuardRailError, ConfigWarnings};

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] =
    ["hostsweep.toml", "config/hostsweep.toml"];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    /// Command-line overrides; these win over every other source.
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file {path} does not exist")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid URL for {field}: {value}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error("failed to load env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigPathProvenance {
    Explicit,
    Env,
    Default,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Read `.env`, the config file and the process environment.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = self.load_env_file()?;
        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Same as [`ConfigLoader::load`] with a caller-supplied environment and
    /// no `.env` handling.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let mut warnings = ConfigWarnings::default();
        if config_path.is_none() {
            warnings.push_with_hint(
                "No hostsweep.toml detected; using environment variables and defaults",
                "Pass --config or set HOSTSWEEP_CONFIG to point at a configuration file",
            );
        }

        let config = self.compose_config(file_config.unwrap_or_default(), env, config_path)?;
        warnings.extend(validation::apply_guard_rails(&config)?);

        Ok(ConfigLoad { config, warnings })
    }

    fn load_env_file(&self) -> Result<bool, ConfigLoadError> {
        let loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true),
            None => dotenvy::dotenv().map(|_| true),
        };
        match loaded {
            Ok(loaded) => Ok(loaded),
            Err(dotenvy::Error::Io(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn resolve_config_path(
        &self,
        env: &EnvConfig,
    ) -> Option<(PathBuf, ConfigPathProvenance)> {
        if let Some(explicit) = &self.options.config_path {
            return Some((explicit.clone(), ConfigPathProvenance::Explicit));
        }
        if let Some(from_env) = &env.config_path {
            return Some((from_env.clone(), ConfigPathProvenance::Env));
        }
        DEFAULT_CONFIG_LOCATIONS
            .iter()
            .map(Path::new)
            .find(|candidate| candidate.exists())
            .map(|path| (path.to_path_buf(), ConfigPathProvenance::Default))
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let Some((path, provenance)) = self.resolve_config_path(env) else {
            return Ok((None, None));
        };

        if !path.exists() {
            if provenance == ConfigPathProvenance::Default {
                return Ok((None, None));
            }
            return Err(ConfigLoadError::MissingConfig { path });
        }

        let contents = fs::read_to_string(&path).map_err(|source| {
            ConfigLoadError::Io {
                path: path.clone(),
                source,
            }
        })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
                path: path.clone(),
                source,
            })?;

        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file: FileConfig,
        env: EnvConfig,
        config_path: Option<PathBuf>,
    ) -> Result<Config, ConfigLoadError> {
        let FileConfig {
            server: file_server,
            database: file_database,
            discovery: file_discovery,
            scan: file_scan,
            queue: file_queue,
            report: file_report,
            logging: file_logging,
        } = file;

        let server = ServerConfig {
            host: self
                .options
                .host
                .clone()
                .or(env.server_host)
                .or(file_server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: self
                .options
                .port
                .or(env.server_port)
                .or(file_server.port)
                .unwrap_or(8080),
        };

        let database = DatabaseConfig {
            backend: file_database.backend.unwrap_or_default(),
            url: env.database_url.or(file_database.url),
            max_connections: file_database.max_connections.unwrap_or(10),
            run_migrations: file_database.run_migrations.unwrap_or(true),
        };
        if let (DatabaseBackend::Postgres, Some(url)) = (database.backend, &database.url) {
            parse_url("database.url", url)?;
        }

        let discovery = DiscoveryConfig {
            pipeline: endpoint(
                "discovery.pipeline.url",
                env.pipeline_url,
                file_discovery.pipeline,
                DEFAULT_PIPELINE_URL,
                None,
            )?,
            adhoc: endpoint(
                "discovery.adhoc.url",
                env.adhoc_url,
                file_discovery.adhoc,
                DEFAULT_ADHOC_URL,
                Some(DEFAULT_ADHOC_TIMEOUT_SECS),
            )?,
        };

        let scan = ScanConfig {
            group_size: file_scan.group_size.unwrap_or(5),
            sub_batch_size: file_scan.sub_batch_size.unwrap_or(20),
        };

        let queue = QueueSettings {
            workers: env.queue_workers.or(file_queue.workers).unwrap_or(4),
            retry: RetrySettings {
                max_attempts: file_queue.retry.max_attempts.unwrap_or(3),
                backoff_base_ms: file_queue.retry.backoff_base_ms.unwrap_or(2_000),
                backoff_max_ms: file_queue.retry.backoff_max_ms.unwrap_or(60_000),
            },
        };

        let public_base_url = env
            .public_base_url
            .or(file_report.public_base_url)
            .unwrap_or_else(|| default_public_base_url(&server));
        parse_url("report.public_base_url", &public_base_url)?;

        let report = ReportConfig {
            program: env
                .renderer_program
                .or(file_report.program)
                .unwrap_or_else(|| "python3".to_string()),
            script: env
                .renderer_script
                .or(file_report.script)
                .or_else(|| Some(PathBuf::from("report_new.py"))),
            branding: env.branding.or(file_report.branding),
            work_dir: env
                .report_dir
                .or(file_report.work_dir)
                .unwrap_or_else(|| PathBuf::from("reports")),
            public_dir: env
                .public_dir
                .or(file_report.public_dir)
                .unwrap_or_else(|| PathBuf::from("public")),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        };

        let logging = LoggingConfig {
            filter: file_logging.filter,
            json: file_logging.json.unwrap_or(false),
        };

        Ok(Config {
            server,
            database,
            discovery,
            scan,
            queue,
            report,
            logging,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded: false,
            },
        })
    }
}

fn endpoint(
    field: &'static str,
    env_url: Option<String>,
    file: FileEndpointConfig,
    default_url: &str,
    default_timeout: Option<u64>,
) -> Result<EndpointConfig, ConfigLoadError> {
    let raw = env_url
        .or(file.url)
        .unwrap_or_else(|| default_url.to_string());
    Ok(EndpointConfig {
        url: parse_url(field, &raw)?,
        timeout_secs: file.timeout_secs.or(default_timeout),
    })
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, ConfigLoadError> {
    Url::parse(value).map_err(|source| ConfigLoadError::InvalidUrl {
        field,
        value: value.to_string(),
        source,
    })
}

fn default_public_base_url(server: &ServerConfig) -> String {
    let host = match server.host.as_str() {
        "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
        other => other,
    };
    format!("http://{host}:{}", server.port)
}
