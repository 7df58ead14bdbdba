use async_trait::async_trait;

use crate::Result;
use crate::types::{
    NewScan, Page, PageRequest, ReportUpdate, Scan, ScanId, ScanTarget,
};

#[async_trait]
pub trait ScanRepository: Send + Sync {
    /// Create the scan and one pending target per expression, atomically.
    /// Targets are returned in input order.
    async fn create_with_targets(
        &self,
        scan: NewScan,
    ) -> Result<(Scan, Vec<ScanTarget>)>;

    async fn get(&self, id: ScanId) -> Result<Option<Scan>>;

    /// Newest first.
    async fn list(&self, page: PageRequest) -> Result<Page<Scan>>;

    /// `pending -> running`. Returns whether this call made the transition;
    /// running, completed and failed scans are left untouched.
    async fn mark_running(&self, id: ScanId) -> Result<bool>;

    /// Recompute `completed_targets` from the number of `done` targets and
    /// persist it in one step. Returns the new value.
    async fn refresh_completed_targets(&self, id: ScanId) -> Result<i32>;

    /// `running -> completed` iff no target is pending or in progress.
    /// Exactly one concurrent caller observes `true`.
    async fn complete_if_drained(&self, id: ScanId) -> Result<bool>;

    /// `pending | running -> failed`.
    async fn mark_failed(&self, id: ScanId) -> Result<bool>;

    async fn set_report(&self, id: ScanId, update: ReportUpdate) -> Result<()>;
}
