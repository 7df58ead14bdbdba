//! Wiring from a resolved [`Config`] to a running [`AppState`].

use std::{fmt, sync::Arc};

use anyhow::{Context, bail};
use tracing::{info, warn};

use hostsweep_config::{Config, DatabaseBackend, DatabaseConfig, QueueSettings};
use hostsweep_core::discovery::{DiscoveryClient, HttpDiscoveryClient};
use hostsweep_core::orchestration::{InProcJobRuntime, QueueConfig, RetryConfig};
use hostsweep_core::report::{
    ArtifactPublisher, ProcessRenderer, ReportGenerator, ReportRenderer,
    ReportService,
};
use hostsweep_core::scan::{
    AdhocRangeScanner, BatchScanWorker, ScanJobHandler, ScanQueryService,
    ScanSubmissionService,
};
use hostsweep_core::{ResultExtractor, ScanStore, database::postgres};

use super::app_state::AppState;

/// Outbound collaborators of the scan services.
#[derive(Clone)]
pub struct ServiceDeps {
    pub pipeline: Arc<dyn DiscoveryClient>,
    pub adhoc: Arc<dyn DiscoveryClient>,
    pub renderer: Arc<dyn ReportRenderer>,
}

impl fmt::Debug for ServiceDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDeps").finish_non_exhaustive()
    }
}

impl ServiceDeps {
    /// HTTP discovery clients and the external report renderer.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let pipeline = HttpDiscoveryClient::new(
            config.discovery.pipeline.url.clone(),
            config.discovery.pipeline.timeout(),
        )
        .context("failed to build pipeline discovery client")?;
        let adhoc = HttpDiscoveryClient::new(
            config.discovery.adhoc.url.clone(),
            config.discovery.adhoc.timeout(),
        )
        .context("failed to build ad-hoc discovery client")?;
        let renderer = ProcessRenderer::new(
            config.report.program.clone(),
            config.report.script.clone(),
        );

        Ok(Self {
            pipeline: Arc::new(pipeline),
            adhoc: Arc::new(adhoc),
            renderer: Arc::new(renderer),
        })
    }
}

pub fn queue_config(settings: &QueueSettings) -> QueueConfig {
    QueueConfig {
        workers: settings.workers,
        retry: RetryConfig {
            max_attempts: settings.retry.max_attempts,
            backoff_base_ms: settings.retry.backoff_base_ms,
            backoff_max_ms: settings.retry.backoff_max_ms,
        },
    }
}

/// Open the configured backend, running migrations when enabled.
pub async fn open_store(database: &DatabaseConfig) -> anyhow::Result<ScanStore> {
    match database.backend {
        DatabaseBackend::Memory => {
            warn!("using in-memory scan store");
            Ok(ScanStore::in_memory())
        }
        DatabaseBackend::Postgres => {
            let Some(url) = database.url.as_deref() else {
                bail!("DATABASE_URL must be provided for the postgres backend");
            };
            let pool = postgres::connect(url, database.max_connections)
                .await
                .context("failed to connect to PostgreSQL")?;
            if database.run_migrations {
                postgres::migrate(&pool)
                    .await
                    .context("database migration failed")?;
                info!("database migrations applied");
            }
            Ok(ScanStore::from_postgres(pool))
        }
    }
}

/// Build every service and start the job runtime. Must run inside a tokio
/// runtime.
pub fn assemble(config: &Config, store: ScanStore, deps: ServiceDeps) -> AppState {
    let extractor = Arc::new(ResultExtractor::default());

    let batches = Arc::new(BatchScanWorker::new(
        store.clone(),
        deps.pipeline,
        extractor.clone(),
        config.scan.sub_batch_size,
    ));
    let generator = Arc::new(ReportGenerator::new(
        store.clone(),
        deps.renderer,
        ArtifactPublisher::new(
            config.report.public_dir.clone(),
            config.report.public_base_url.clone(),
        ),
        config.report.work_dir.clone(),
        config.report.branding.clone(),
    ));

    let runtime = InProcJobRuntime::start(
        queue_config(&config.queue),
        Arc::new(ScanJobHandler::new(batches, generator)),
    );
    let queue = Arc::new(runtime.clone());

    AppState {
        submissions: Arc::new(ScanSubmissionService::new(
            store.clone(),
            queue.clone(),
            config.scan.group_size,
        )),
        adhoc: Arc::new(AdhocRangeScanner::new(deps.adhoc, extractor)),
        queries: Arc::new(ScanQueryService::new(store.clone())),
        reports: Arc::new(ReportService::new(store.clone(), queue)),
        public_dir: config.report.public_dir.clone(),
        runtime,
        store,
    }
}

/// Production wiring: real store, HTTP clients and renderer.
pub async fn bootstrap(config: &Config) -> anyhow::Result<AppState> {
    for dir in [&config.report.work_dir, &config.report.public_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let store = open_store(&config.database).await?;
    let deps = ServiceDeps::from_config(config)?;
    info!(
        pipeline = %config.discovery.pipeline.url,
        adhoc = %config.discovery.adhoc.url,
        renderer = %config.report.program,
        group_size = config.scan.group_size,
        sub_batch_size = config.scan.sub_batch_size,
        workers = config.queue.workers,
        "scan services configured"
    );

    Ok(assemble(config, store, deps))
}
