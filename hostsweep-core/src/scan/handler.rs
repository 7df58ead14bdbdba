use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, instrument};

use super::batch::BatchScanWorker;
use crate::orchestration::{CompletionOutcome, JobHandler, JobPayload, JobRecord};
use crate::report::ReportGenerator;

/// Routes queued jobs to the batch worker or the report generator.
///
/// Batch jobs failing with a retryable error are retried; report jobs never
/// are, since the generator already records its own failures.
#[derive(Debug)]
pub struct ScanJobHandler {
    batches: Arc<BatchScanWorker>,
    reports: Arc<ReportGenerator>,
}

impl ScanJobHandler {
    pub fn new(batches: Arc<BatchScanWorker>, reports: Arc<ReportGenerator>) -> Self {
        Self { batches, reports }
    }
}

#[async_trait]
impl JobHandler for ScanJobHandler {
    #[instrument(skip_all, fields(job_id = %job.id, kind = %job.payload.kind(), attempt = job.attempts))]
    async fn handle(&self, job: &JobRecord) -> CompletionOutcome {
        match &job.payload {
            JobPayload::ScanBatch(batch) => match self.batches.run(batch).await {
                Ok(_) => CompletionOutcome::Completed,
                Err(err) if err.is_retryable() => CompletionOutcome::Retry {
                    error: err.to_string(),
                },
                Err(err) => CompletionOutcome::DeadLetter {
                    error: err.to_string(),
                },
            },
            JobPayload::GenerateReport(report) => {
                match self.reports.generate(report.scan_id).await {
                    Ok(_) => CompletionOutcome::Completed,
                    Err(err) => {
                        error!(scan_id = %report.scan_id, error = %err, "could not record report outcome");
                        CompletionOutcome::DeadLetter {
                            error: err.to_string(),
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::database::ports::ScanRepository;
    use crate::database::{MemoryStore, ScanStore};
    use crate::error::{Result, SweepError};
    use crate::extract::ResultExtractor;
    use crate::orchestration::{GenerateReportJob, ScanBatchJob};
    use crate::report::ArtifactPublisher;
    use crate::testing::{StubDiscoveryClient, StubRenderer, StubRendering};
    use crate::types::{
        NewScan, Page, PageRequest, ReportStatus, ReportUpdate, Scan, ScanId, ScanTarget,
    };

    /// Scan port over a [`MemoryStore`] whose selected writes fail.
    struct BrokenScans {
        inner: Arc<MemoryStore>,
        fail_refresh: bool,
        fail_report: bool,
    }

    fn unavailable() -> SweepError {
        SweepError::Internal("store unavailable".into())
    }

    #[async_trait]
    impl ScanRepository for BrokenScans {
        async fn create_with_targets(&self, scan: NewScan) -> Result<(Scan, Vec<ScanTarget>)> {
            self.inner.create_with_targets(scan).await
        }

        async fn get(&self, id: ScanId) -> Result<Option<Scan>> {
            ScanRepository::get(self.inner.as_ref(), id).await
        }

        async fn list(&self, page: PageRequest) -> Result<Page<Scan>> {
            self.inner.list(page).await
        }

        async fn mark_running(&self, id: ScanId) -> Result<bool> {
            self.inner.mark_running(id).await
        }

        async fn refresh_completed_targets(&self, id: ScanId) -> Result<i32> {
            if self.fail_refresh {
                return Err(unavailable());
            }
            self.inner.refresh_completed_targets(id).await
        }

        async fn complete_if_drained(&self, id: ScanId) -> Result<bool> {
            self.inner.complete_if_drained(id).await
        }

        async fn mark_failed(&self, id: ScanId) -> Result<bool> {
            self.inner.mark_failed(id).await
        }

        async fn set_report(&self, id: ScanId, update: ReportUpdate) -> Result<()> {
            if self.fail_report {
                return Err(unavailable());
            }
            self.inner.set_report(id, update).await
        }
    }

    struct Fixture {
        memory: Arc<MemoryStore>,
        handler: ScanJobHandler,
        _dir: tempfile::TempDir,
    }

    fn fixture(fail_refresh: bool, fail_report: bool, rendering: StubRendering) -> Fixture {
        let memory = Arc::new(MemoryStore::new());
        let mut store = ScanStore::from_memory(memory.clone());
        store.scans = Arc::new(BrokenScans {
            inner: memory.clone(),
            fail_refresh,
            fail_report,
        });

        let client = Arc::new(StubDiscoveryClient::default());
        client.respond("10.0.0.1", json!({"alive_hosts": ["10.0.0.1"]}));
        let batches = Arc::new(BatchScanWorker::new(
            store.clone(),
            client,
            Arc::new(ResultExtractor::default()),
            20,
        ));

        let dir = tempfile::tempdir().unwrap();
        let reports = Arc::new(ReportGenerator::new(
            store,
            Arc::new(StubRenderer::new(rendering)),
            ArtifactPublisher::new(dir.path().join("public"), "http://reports.local"),
            dir.path().join("work"),
            None,
        ));

        Fixture {
            memory,
            handler: ScanJobHandler::new(batches, reports),
            _dir: dir,
        }
    }

    async fn scan(memory: &MemoryStore, targets: &[&str]) -> (ScanId, Vec<ScanTarget>) {
        let (scan, targets) = memory
            .create_with_targets(NewScan {
                name: "handler".into(),
                targets: targets.iter().map(|t| t.to_string()).collect(),
            })
            .await
            .unwrap();
        (scan.id, targets)
    }

    fn batch_job(scan_id: ScanId, targets: &[ScanTarget]) -> JobRecord {
        JobRecord::new(JobPayload::ScanBatch(ScanBatchJob {
            scan_id,
            targets: targets.iter().map(|t| t.to_ref()).collect(),
        }))
    }

    fn report_job(scan_id: ScanId) -> JobRecord {
        JobRecord::new(JobPayload::GenerateReport(GenerateReportJob { scan_id }))
    }

    #[tokio::test]
    async fn unreachable_target_still_completes_the_job() {
        let fx = fixture(false, false, StubRendering::WriteOutput);
        let (scan_id, targets) = scan(&fx.memory, &["10.0.0.1", "10.9.9.9"]).await;

        let outcome = fx.handler.handle(&batch_job(scan_id, &targets)).await;

        assert_eq!(outcome, CompletionOutcome::Completed);
    }

    #[tokio::test]
    async fn store_failure_during_batch_is_retried() {
        let fx = fixture(true, false, StubRendering::WriteOutput);
        let (scan_id, targets) = scan(&fx.memory, &["10.0.0.1"]).await;

        let outcome = fx.handler.handle(&batch_job(scan_id, &targets)).await;

        match outcome {
            CompletionOutcome::Retry { error } => assert!(error.contains("store unavailable")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn batch_for_missing_scan_is_dead_lettered() {
        let fx = fixture(false, false, StubRendering::WriteOutput);
        let (_, targets) = scan(&fx.memory, &["10.0.0.1"]).await;

        let outcome = fx.handler.handle(&batch_job(ScanId::new(), &targets)).await;

        assert!(matches!(outcome, CompletionOutcome::DeadLetter { .. }));
    }

    #[tokio::test]
    async fn render_failure_is_recorded_not_retried() {
        let fx = fixture(false, false, StubRendering::Fail("boom".into()));
        let (scan_id, targets) = scan(&fx.memory, &["10.0.0.1"]).await;
        let batch = fx.handler.handle(&batch_job(scan_id, &targets)).await;
        assert_eq!(batch, CompletionOutcome::Completed);

        let outcome = fx.handler.handle(&report_job(scan_id)).await;

        assert_eq!(outcome, CompletionOutcome::Completed);
        let scan = ScanRepository::get(fx.memory.as_ref(), scan_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(scan.report_status, Some(ReportStatus::Failed));
        assert_eq!(scan.report_error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn report_that_cannot_be_recorded_is_dead_lettered() {
        let fx = fixture(false, true, StubRendering::WriteOutput);
        let (scan_id, _) = scan(&fx.memory, &["10.0.0.1"]).await;

        let outcome = fx.handler.handle(&report_job(scan_id)).await;

        match outcome {
            CompletionOutcome::DeadLetter { error } => {
                assert!(error.contains("store unavailable"))
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
