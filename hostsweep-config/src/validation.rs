use thiserror::Error;

use super::models::{Config, DatabaseBackend};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigGuardRailError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("database.url (or DATABASE_URL) is required for the postgres backend")]
    MissingDatabaseUrl,
    #[error("queue.retry.backoff_max_ms ({max}) is below backoff_base_ms ({base})")]
    InvertedBackoff { base: u64, max: u64 },
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    for (field, value) in [
        ("scan.group_size", config.scan.group_size),
        ("scan.sub_batch_size", config.scan.sub_batch_size),
        ("queue.workers", config.queue.workers),
        ("queue.retry.max_attempts", usize::from(config.queue.retry.max_attempts)),
        ("database.max_connections", config.database.max_connections as usize),
    ] {
        if value == 0 {
            return Err(ConfigGuardRailError::Zero { field });
        }
    }

    let retry = config.queue.retry;
    if retry.backoff_max_ms < retry.backoff_base_ms {
        return Err(ConfigGuardRailError::InvertedBackoff {
            base: retry.backoff_base_ms,
            max: retry.backoff_max_ms,
        });
    }

    match config.database.backend {
        DatabaseBackend::Postgres if config.database.url.is_none() => {
            return Err(ConfigGuardRailError::MissingDatabaseUrl);
        }
        DatabaseBackend::Memory => warnings.push_with_hint(
            "Using the in-memory store; scans are lost on restart",
            "Set database.backend = \"postgres\" and DATABASE_URL for durable storage",
        ),
        DatabaseBackend::Postgres => {}
    }

    if let Some(branding) = &config.report.branding
        && !branding.exists()
    {
        warnings.push(format!(
            "Branding asset {} does not exist; the renderer may fail",
            branding.display()
        ));
    }

    if config.discovery.pipeline.timeout_secs.is_none() {
        warnings.push_with_hint(
            "Pipeline probes have no timeout",
            "Set discovery.pipeline.timeout_secs to bound slow sweeps",
        );
    }

    Ok(warnings)
}
