use async_trait::async_trait;

use crate::Result;
use crate::types::{NewScanResult, Page, PageRequest, ScanId, ScanResult};

#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Insert unless a row for `(scan, target, ip)` exists. Returns whether a
    /// row was written.
    async fn insert_if_absent(&self, result: NewScanResult) -> Result<bool>;

    /// All rows for a scan, oldest first, payloads included.
    async fn list_for_scan(&self, scan_id: ScanId) -> Result<Vec<ScanResult>>;

    /// Paged listing without payloads.
    async fn page_for_scan(
        &self,
        scan_id: ScanId,
        page: PageRequest,
    ) -> Result<Page<ScanResult>>;
}
