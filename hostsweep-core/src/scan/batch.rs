use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::database::ScanStore;
use crate::discovery::DiscoveryClient;
use crate::error::{Result, SweepError};
use crate::extract::ResultExtractor;
use crate::orchestration::ScanBatchJob;
use crate::types::{NewScanResult, ScanId, TargetRef};

pub const DEFAULT_SUB_BATCH_SIZE: usize = 20;

/// Tally of one batch invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub done: usize,
    pub failed: usize,
    /// Targets already terminal from an earlier attempt.
    pub skipped: usize,
    /// Result rows written (duplicates excluded).
    pub discovered: usize,
    pub completed_targets: i32,
    /// Whether this invocation moved the scan to `completed`.
    pub completed_scan: bool,
}

/// Probes one group of targets and records what the backend found.
pub struct BatchScanWorker {
    store: ScanStore,
    client: Arc<dyn DiscoveryClient>,
    extractor: Arc<ResultExtractor>,
    sub_batch_size: usize,
}

impl std::fmt::Debug for BatchScanWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScanWorker")
            .field("store", &self.store)
            .field("extractor", &self.extractor)
            .field("sub_batch_size", &self.sub_batch_size)
            .finish()
    }
}

impl BatchScanWorker {
    pub fn new(
        store: ScanStore,
        client: Arc<dyn DiscoveryClient>,
        extractor: Arc<ResultExtractor>,
        sub_batch_size: usize,
    ) -> Self {
        Self {
            store,
            client,
            extractor,
            sub_batch_size: sub_batch_size.max(1),
        }
    }

    /// Process every target of the group in order.
    ///
    /// Per-target failures are recorded on the target and never abort the
    /// batch. Store failures propagate so the job can be retried; targets
    /// finished by an earlier attempt are skipped. A scan that disappears
    /// mid-batch yields [`SweepError::ScanNotFound`].
    #[instrument(skip_all, fields(scan_id = %job.scan_id, targets = job.targets.len()))]
    pub async fn run(&self, job: &ScanBatchJob) -> Result<BatchOutcome> {
        let scan_id = job.scan_id;
        let mut outcome = BatchOutcome::default();

        for chunk in job.targets.chunks(self.sub_batch_size) {
            for target in chunk {
                if self.store.scans.get(scan_id).await?.is_none() {
                    warn!(%scan_id, "scan no longer exists; aborting batch");
                    return Err(SweepError::ScanNotFound(scan_id));
                }
                self.store.scans.mark_running(scan_id).await?;

                if !self.store.targets.mark_in_progress(target.id).await? {
                    debug!(target = %target.target, "target already terminal; skipping");
                    outcome.skipped += 1;
                    continue;
                }

                match self.process_target(scan_id, target).await {
                    Ok(written) => {
                        self.store.targets.mark_done(target.id).await?;
                        outcome.done += 1;
                        outcome.discovered += written;
                    }
                    Err(err) => {
                        let message = failure_text(&err);
                        warn!(target = %target.target, error = %message, "target failed");
                        self.store.targets.mark_error(target.id, &message).await?;
                        outcome.failed += 1;
                    }
                }
            }

            outcome.completed_targets =
                self.store.scans.refresh_completed_targets(scan_id).await?;
            debug!(
                %scan_id,
                completed_targets = outcome.completed_targets,
                "sub-batch finished"
            );
        }

        outcome.completed_scan = self.store.scans.complete_if_drained(scan_id).await?;
        if outcome.completed_scan {
            info!(%scan_id, completed_targets = outcome.completed_targets, "scan completed");
        }

        info!(
            %scan_id,
            done = outcome.done,
            failed = outcome.failed,
            skipped = outcome.skipped,
            discovered = outcome.discovered,
            "batch finished"
        );
        Ok(outcome)
    }

    /// Probe, extract and persist one target. Returns the number of new rows.
    async fn process_target(&self, scan_id: ScanId, target: &TargetRef) -> Result<usize> {
        let response: Value = self.client.probe(&target.target).await?;

        let extraction = self.extractor.extract(&response);
        if extraction.is_empty() {
            warn!(target = %target.target, "no live hosts recognised in response");
            return Ok(0);
        }
        debug!(
            target = %target.target,
            kind = extraction.kind(),
            addresses = extraction.addresses().len(),
            "extracted live hosts"
        );

        let mut written = 0;
        for ip in extraction.into_addresses() {
            let inserted = self
                .store
                .results
                .insert_if_absent(NewScanResult {
                    scan_id,
                    target_id: Some(target.id),
                    ip,
                    data: response.clone(),
                })
                .await?;
            if inserted {
                written += 1;
            }
        }
        Ok(written)
    }
}

/// Text recorded on a failed target: `HTTP <status> <body>` for backend
/// rejections, the bare error otherwise.
fn failure_text(err: &SweepError) -> String {
    match err {
        SweepError::Transport(probe) => probe.to_string(),
        other => other.to_string(),
    }
}
