use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::database::ScanStore;
use crate::error::{Result, SweepError};
use crate::orchestration::{GenerateReportJob, JobPayload, JobQueue};
use crate::types::{ReportStatus, ReportUpdate, ScanId};

/// Reply to a report trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTicket {
    pub status: &'static str,
    pub message: String,
}

/// Pollable report state: `{"status": "ready", "url": ...}` once published,
/// `{"status": <current>}` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportStatusView {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Status reported before any report was requested.
pub const PROCESSING: &str = "processing";

pub struct ReportService {
    store: ScanStore,
    queue: Arc<dyn JobQueue>,
}

impl std::fmt::Debug for ReportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportService")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl ReportService {
    pub fn new(store: ScanStore, queue: Arc<dyn JobQueue>) -> Self {
        Self { store, queue }
    }

    /// Mark the report queued and schedule generation.
    pub async fn trigger(&self, scan_id: ScanId) -> Result<ReportTicket> {
        self.store
            .scans
            .get(scan_id)
            .await?
            .ok_or(SweepError::ScanNotFound(scan_id))?;

        self.store
            .scans
            .set_report(scan_id, ReportUpdate::Queued)
            .await?;
        let job_id = self
            .queue
            .enqueue(JobPayload::GenerateReport(GenerateReportJob { scan_id }))
            .await?;
        info!(%scan_id, %job_id, "report queued");

        Ok(ReportTicket {
            status: ReportStatus::Queued.as_str(),
            message: "Report generation has been queued".to_string(),
        })
    }

    pub async fn status(&self, scan_id: ScanId) -> Result<ReportStatusView> {
        let scan = self
            .store
            .scans
            .get(scan_id)
            .await?
            .ok_or(SweepError::ScanNotFound(scan_id))?;

        let view = match (scan.report_status, scan.report_url) {
            (Some(ReportStatus::Ready), Some(url)) if !url.is_empty() => ReportStatusView {
                status: ReportStatus::Ready.as_str().to_string(),
                url: Some(url),
            },
            (status, _) => ReportStatusView {
                status: status
                    .map(|s| s.as_str())
                    .unwrap_or(PROCESSING)
                    .to_string(),
                url: None,
            },
        };
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::RecordingQueue;
    use crate::types::NewScan;

    async fn setup() -> (ReportService, ScanStore, Arc<RecordingQueue>, ScanId) {
        let store = ScanStore::in_memory();
        let queue = Arc::new(RecordingQueue::default());
        let (scan, _) = store
            .scans
            .create_with_targets(NewScan {
                name: "r".into(),
                targets: vec!["10.0.0.1".into()],
            })
            .await
            .unwrap();
        (ReportService::new(store.clone(), queue.clone()), store, queue, scan.id)
    }

    #[tokio::test]
    async fn trigger_queues_job_and_persists_state() {
        let (service, store, queue, scan_id) = setup().await;

        let ticket = service.trigger(scan_id).await.unwrap();

        assert_eq!(ticket.status, "queued");
        assert_eq!(
            queue.payloads(),
            vec![JobPayload::GenerateReport(GenerateReportJob { scan_id })]
        );
        let scan = store.scans.get(scan_id).await.unwrap().unwrap();
        assert_eq!(scan.report_status, Some(ReportStatus::Queued));
        assert_eq!(service.status(scan_id).await.unwrap().status, "queued");
    }

    #[tokio::test]
    async fn unknown_scan_is_not_found_and_nothing_is_queued() {
        let (service, _, queue, _) = setup().await;
        let err = service.trigger(ScanId::new()).await.unwrap_err();
        assert!(matches!(err, SweepError::ScanNotFound(_)));
        assert!(queue.payloads().is_empty());
    }

    #[tokio::test]
    async fn status_views_follow_report_state() {
        let (service, store, _, scan_id) = setup().await;

        let view = service.status(scan_id).await.unwrap();
        assert_eq!(serde_json::to_value(&view).unwrap(), json!({"status": "processing"}));

        store
            .scans
            .set_report(
                scan_id,
                ReportUpdate::Ready {
                    path: "/srv/public/reports/r.pdf".into(),
                    url: "http://host/reports/r.pdf".into(),
                },
            )
            .await
            .unwrap();
        let view = service.status(scan_id).await.unwrap();
        assert_eq!(
            serde_json::to_value(&view).unwrap(),
            json!({"status": "ready", "url": "http://host/reports/r.pdf"})
        );

        store
            .scans
            .set_report(scan_id, ReportUpdate::Failed { error: "boom".into() })
            .await
            .unwrap();
        assert_eq!(service.status(scan_id).await.unwrap().status, "failed");
    }
}
