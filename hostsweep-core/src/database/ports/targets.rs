use async_trait::async_trait;

use crate::Result;
use crate::types::{Page, PageRequest, ScanId, ScanTarget, TargetId};

#[async_trait]
pub trait TargetRepository: Send + Sync {
    async fn get(&self, id: TargetId) -> Result<Option<ScanTarget>>;

    /// Input order.
    async fn list_for_scan(
        &self,
        scan_id: ScanId,
        page: PageRequest,
    ) -> Result<Page<ScanTarget>>;

    /// Move a pending (or stranded in-progress) target to `in_progress` and
    /// clear its last error. Returns `false` when the target is missing or
    /// already terminal.
    async fn mark_in_progress(&self, id: TargetId) -> Result<bool>;

    async fn mark_done(&self, id: TargetId) -> Result<()>;

    async fn mark_error(&self, id: TargetId, error: &str) -> Result<()>;
}
