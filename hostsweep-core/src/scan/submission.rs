use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use super::partition::partition_targets;
use crate::database::ScanStore;
use crate::error::{Result, SweepError};
use crate::orchestration::{JobPayload, JobQueue, ScanBatchJob};
use crate::types::{NewScan, ScanId, TargetRef};

pub const DEFAULT_GROUP_SIZE: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitScan {
    pub targets: Vec<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub message: String,
    pub scan_id: ScanId,
    pub groups: usize,
}

/// Creates scans and fans their targets out as batch jobs.
pub struct ScanSubmissionService {
    store: ScanStore,
    queue: Arc<dyn JobQueue>,
    group_size: usize,
}

impl std::fmt::Debug for ScanSubmissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSubmissionService")
            .field("store", &self.store)
            .field("group_size", &self.group_size)
            .finish()
    }
}

impl ScanSubmissionService {
    pub fn new(
        store: ScanStore,
        queue: Arc<dyn JobQueue>,
        group_size: usize,
    ) -> Self {
        Self {
            store,
            queue,
            group_size: group_size.max(1),
        }
    }

    #[instrument(skip_all, fields(targets = request.targets.len()))]
    pub async fn submit(&self, request: SubmitScan) -> Result<SubmissionReceipt> {
        let targets = validate_targets(request.targets)?;
        let name = request
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(default_scan_name);

        let (scan, records) = self
            .store
            .scans
            .create_with_targets(NewScan { name, targets })
            .await?;

        let refs: Vec<TargetRef> = records.iter().map(|t| t.to_ref()).collect();
        let groups = partition_targets(&refs, self.group_size);
        let group_count = groups.len();
        for group in groups {
            let enqueued = self
                .queue
                .enqueue(JobPayload::ScanBatch(ScanBatchJob {
                    scan_id: scan.id,
                    targets: group,
                }))
                .await;
            if let Err(err) = enqueued {
                // Unqueued groups would stay pending and the scan could never
                // complete.
                error!(scan_id = %scan.id, error = %err, "enqueue failed; failing scan");
                self.store.scans.mark_failed(scan.id).await?;
                return Err(err);
            }
        }

        self.store.scans.mark_running(scan.id).await?;
        info!(
            scan_id = %scan.id,
            name = %scan.name,
            total_targets = scan.total_targets,
            groups = group_count,
            "scan submitted"
        );

        Ok(SubmissionReceipt {
            message: format!("{group_count} jobs submitted"),
            scan_id: scan.id,
            groups: group_count,
        })
    }
}

/// Reject empty lists and blank expressions; surrounding whitespace is
/// dropped.
pub fn validate_targets(targets: Vec<String>) -> Result<Vec<String>> {
    if targets.is_empty() {
        return Err(SweepError::invalid("at least one target is required"));
    }
    targets
        .into_iter()
        .enumerate()
        .map(|(index, target)| {
            let trimmed = target.trim();
            if trimmed.is_empty() {
                Err(SweepError::invalid(format!("target {index} is blank")))
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}

pub fn default_scan_name() -> String {
    format!("network-scan-{}", Utc::now().format("%Y%m%d-%H%M%S"))
}
