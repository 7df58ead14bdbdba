use serde::Serialize;

use crate::database::ScanStore;
use crate::error::{Result, SweepError};
use crate::types::{Page, PageRequest, Scan, ScanId, ScanResult, ScanTarget};

pub const DEFAULT_SCANS_PER_PAGE: u32 = 20;
pub const MAX_SCANS_PER_PAGE: u32 = 100;
pub const DEFAULT_TARGETS_PER_PAGE: u32 = 50;
pub const DEFAULT_RESULTS_PER_PAGE: u32 = 200;

/// A scan with one page of its targets and one page of its results.
/// Result payloads are left out.
#[derive(Debug, Clone, Serialize)]
pub struct ScanDetails {
    pub scan: Scan,
    pub targets: Page<ScanTarget>,
    pub results: Page<ScanResult>,
}

/// Read side backing the dashboard.
#[derive(Debug, Clone)]
pub struct ScanQueryService {
    store: ScanStore,
}

impl ScanQueryService {
    pub fn new(store: ScanStore) -> Self {
        Self { store }
    }

    /// Newest first.
    pub async fn list(&self, page: u32, per_page: Option<u32>) -> Result<Page<Scan>> {
        let per_page = per_page
            .unwrap_or(DEFAULT_SCANS_PER_PAGE)
            .min(MAX_SCANS_PER_PAGE);
        self.store.scans.list(PageRequest::new(page, per_page)).await
    }

    pub async fn details(
        &self,
        id: ScanId,
        targets_page: u32,
        results_page: u32,
    ) -> Result<ScanDetails> {
        let scan = self
            .store
            .scans
            .get(id)
            .await?
            .ok_or(SweepError::ScanNotFound(id))?;

        let targets = self
            .store
            .targets
            .list_for_scan(id, PageRequest::new(targets_page, DEFAULT_TARGETS_PER_PAGE))
            .await?;
        let results = self
            .store
            .results
            .page_for_scan(id, PageRequest::new(results_page, DEFAULT_RESULTS_PER_PAGE))
            .await?;

        Ok(ScanDetails {
            scan,
            targets,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{NewScan, NewScanResult};

    #[tokio::test]
    async fn lists_newest_first_with_capped_page_size() {
        let store = ScanStore::in_memory();
        for name in ["first", "second", "third"] {
            store
                .scans
                .create_with_targets(NewScan {
                    name: name.into(),
                    targets: vec!["10.0.0.1".into()],
                })
                .await
                .unwrap();
        }
        let queries = ScanQueryService::new(store);

        let page = queries.list(1, Some(2)).await.unwrap();
        let names: Vec<_> = page.items.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["third", "second"]);
        assert_eq!(page.total, 3);

        let page = queries.list(1, Some(10_000)).await.unwrap();
        assert_eq!(page.per_page, MAX_SCANS_PER_PAGE);

        let page = queries.list(1, None).await.unwrap();
        assert_eq!(page.per_page, DEFAULT_SCANS_PER_PAGE);
    }

    #[tokio::test]
    async fn details_omit_result_payloads() {
        let store = ScanStore::in_memory();
        let (scan, targets) = store
            .scans
            .create_with_targets(NewScan {
                name: "details".into(),
                targets: vec!["10.0.0.0/30".into()],
            })
            .await
            .unwrap();
        store
            .results
            .insert_if_absent(NewScanResult {
                scan_id: scan.id,
                target_id: Some(targets[0].id),
                ip: "10.0.0.1".into(),
                data: json!({"alive_hosts": ["10.0.0.1"]}),
            })
            .await
            .unwrap();

        let details = ScanQueryService::new(store).details(scan.id, 1, 1).await.unwrap();

        assert_eq!(details.scan.id, scan.id);
        assert_eq!(details.targets.items.len(), 1);
        assert_eq!(details.targets.per_page, DEFAULT_TARGETS_PER_PAGE);
        assert_eq!(details.results.items.len(), 1);
        assert!(details.results.items[0].data.is_none());
    }

    #[tokio::test]
    async fn unknown_scan_is_not_found() {
        let queries = ScanQueryService::new(ScanStore::in_memory());
        let err = queries.details(ScanId::new(), 1, 1).await.unwrap_err();
        assert!(matches!(err, SweepError::ScanNotFound(_)));
    }
}
