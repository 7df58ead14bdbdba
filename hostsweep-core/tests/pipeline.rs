//! End-to-end run through the in-process runtime: submission, concurrent
//! batch workers, completion, and report generation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use hostsweep_core::database::MemoryStore;
use hostsweep_core::database::ports::ResultRepository;
use hostsweep_core::discovery::{DiscoveryClient, ProbeError};
use hostsweep_core::orchestration::{InProcJobRuntime, QueueConfig, RetryConfig};
use hostsweep_core::report::{
    ArtifactPublisher, RenderError, RenderRequest, RenderedArtifact, ReportGenerator,
    ReportRenderer, ReportService,
};
use hostsweep_core::scan::{
    BatchScanWorker, ScanJobHandler, ScanSubmissionService, SubmitScan,
};
use hostsweep_core::types::{PageRequest, ScanStatus, TargetStatus};
use hostsweep_core::{ResultExtractor, ScanStore};
use serde_json::{Value, json};

/// Every target reports itself plus a shared gateway; `10.9.9.9` is down.
struct EchoBackend;

#[async_trait]
impl DiscoveryClient for EchoBackend {
    async fn probe(&self, target: &str) -> Result<Value, ProbeError> {
        if target == "10.9.9.9" {
            return Err(ProbeError::Status {
                status: 504,
                body: "timeout".into(),
            });
        }
        Ok(json!({"alive_hosts": [target, "10.0.0.254"], "count": 2}))
    }
}

struct FileRenderer;

#[async_trait]
impl ReportRenderer for FileRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedArtifact, RenderError> {
        let summary = format!("{} inputs", request.inputs.len());
        tokio::fs::write(&request.output, summary).await?;
        Ok(RenderedArtifact {
            path: request.output.clone(),
        })
    }
}

struct Harness {
    memory: Arc<MemoryStore>,
    store: ScanStore,
    runtime: InProcJobRuntime,
    submissions: ScanSubmissionService,
    reports: ReportService,
    _work: tempfile::TempDir,
    _public: tempfile::TempDir,
}

fn harness() -> Harness {
    let memory = Arc::new(MemoryStore::new());
    let store = ScanStore::from_memory(memory.clone());
    let extractor = Arc::new(ResultExtractor::default());
    let work = tempfile::tempdir().unwrap();
    let public = tempfile::tempdir().unwrap();

    let batches = Arc::new(BatchScanWorker::new(
        store.clone(),
        Arc::new(EchoBackend),
        extractor,
        2,
    ));
    let generator = Arc::new(ReportGenerator::new(
        store.clone(),
        Arc::new(FileRenderer),
        ArtifactPublisher::new(public.path(), "http://localhost:8080"),
        work.path(),
        None,
    ));
    let runtime = InProcJobRuntime::start(
        QueueConfig {
            workers: 3,
            retry: RetryConfig {
                max_attempts: 3,
                backoff_base_ms: 1,
                backoff_max_ms: 5,
            },
        },
        Arc::new(ScanJobHandler::new(batches, generator)),
    );
    let queue = Arc::new(runtime.clone());

    Harness {
        memory,
        submissions: ScanSubmissionService::new(store.clone(), queue.clone(), 3),
        reports: ReportService::new(store.clone(), queue),
        store,
        runtime,
        _work: work,
        _public: public,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scan_runs_to_completion_and_reports() {
    let h = harness();
    let targets: Vec<String> = vec![
        "10.0.0.1", "10.0.0.2", "10.0.0.3", "10.9.9.9", "10.0.0.5", "10.0.0.6", "10.0.0.7",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    let receipt = h
        .submissions
        .submit(SubmitScan {
            targets: targets.clone(),
            name: None,
        })
        .await
        .unwrap();
    assert_eq!(receipt.groups, 3);

    h.runtime.wait_idle().await;

    let scan = h.store.scans.get(receipt.scan_id).await.unwrap().unwrap();
    assert_eq!(scan.status, ScanStatus::Completed);
    assert_eq!(scan.total_targets, 7);
    assert_eq!(scan.completed_targets, 6);

    let page = h
        .store
        .targets
        .list_for_scan(receipt.scan_id, PageRequest::new(1, 50))
        .await
        .unwrap();
    let statuses: HashMap<&str, TargetStatus> = page
        .items
        .iter()
        .map(|t| (t.target.as_str(), t.status))
        .collect();
    assert_eq!(statuses["10.9.9.9"], TargetStatus::Error);
    assert_eq!(
        statuses.values().filter(|s| **s == TargetStatus::Done).count(),
        6
    );

    // Each target contributes itself and the gateway once.
    let results = ResultRepository::list_for_scan(h.memory.as_ref(), receipt.scan_id)
        .await
        .unwrap();
    assert_eq!(results.len(), 12);

    let ticket = h.reports.trigger(receipt.scan_id).await.unwrap();
    assert_eq!(ticket.status, "queued");
    h.runtime.wait_idle().await;

    let status = h.reports.status(receipt.scan_id).await.unwrap();
    assert_eq!(status.status, "ready");
    let url = status.url.unwrap();
    assert!(url.starts_with("http://localhost:8080/reports/scan_"));

    let stats = h.runtime.stats();
    assert_eq!(stats.completed, 4);
    // The unreachable target is recorded on the target, not retried as a job.
    assert_eq!(stats.retried, 0);
    assert_eq!(stats.dead_lettered, 0);
    h.runtime.shutdown().await;
}

#[tokio::test]
async fn report_for_scan_without_results_is_no_results() {
    let h = harness();
    let receipt = h
        .submissions
        .submit(SubmitScan {
            targets: vec!["10.9.9.9".into()],
            name: Some("unreachable".into()),
        })
        .await
        .unwrap();
    h.runtime.wait_idle().await;

    h.reports.trigger(receipt.scan_id).await.unwrap();
    h.runtime.wait_idle().await;

    let status = h.reports.status(receipt.scan_id).await.unwrap();
    assert_eq!(status.status, "no_results");
    assert!(status.url.is_none());
    h.runtime.shutdown().await;
}
