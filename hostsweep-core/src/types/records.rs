use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ReportStatus, ResultId, ScanId, ScanStatus, TargetId, TargetStatus};

/// One submitted unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub id: ScanId,
    pub name: String,
    pub status: ScanStatus,
    pub total_targets: i32,
    pub completed_targets: i32,
    pub report_status: Option<ReportStatus>,
    pub report_path: Option<String>,
    pub report_url: Option<String>,
    pub report_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One target expression (IP, CIDR, range) belonging to a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanTarget {
    pub id: TargetId,
    pub scan_id: ScanId,
    pub target: String,
    pub status: TargetStatus,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScanTarget {
    pub fn to_ref(&self) -> TargetRef {
        TargetRef {
            id: self.id,
            target: self.target.clone(),
        }
    }
}

/// One discovered live address attributed to a scan (and usually a target).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub id: ResultId,
    pub scan_id: ScanId,
    pub target_id: Option<TargetId>,
    pub ip: String,
    /// Raw discovery response the address was extracted from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Minimal target handle carried inside batch jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    pub id: TargetId,
    pub target: String,
}

#[derive(Debug, Clone)]
pub struct NewScan {
    pub name: String,
    pub targets: Vec<String>,
}

impl NewScan {
    /// Target count as stored in `scans.total_targets`.
    pub fn total_targets(&self) -> crate::Result<i32> {
        target_count(self.targets.len())
    }
}

fn target_count(len: usize) -> crate::Result<i32> {
    i32::try_from(len)
        .map_err(|_| crate::SweepError::invalid(format!("too many targets: {len}")))
}

#[derive(Debug, Clone)]
pub struct NewScanResult {
    pub scan_id: ScanId,
    pub target_id: Option<TargetId>,
    pub ip: String,
    pub data: Value,
}

/// Report columns written as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportUpdate {
    Queued,
    NoResults,
    Ready { path: String, url: String },
    Failed { error: String },
}

impl ReportUpdate {
    pub fn status(&self) -> ReportStatus {
        match self {
            ReportUpdate::Queued => ReportStatus::Queued,
            ReportUpdate::NoResults => ReportStatus::NoResults,
            ReportUpdate::Ready { .. } => ReportStatus::Ready,
            ReportUpdate::Failed { .. } => ReportStatus::Failed,
        }
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub const MAX_PER_PAGE: u32 = 500;

    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_and_offsets() {
        let request = PageRequest::new(0, 0);
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, 1);
        assert_eq!(request.offset(), 0);

        let request = PageRequest::new(3, 20);
        assert_eq!(request.offset(), 40);
        assert_eq!(request.limit(), 20);

        let request = PageRequest::new(1, 10_000);
        assert_eq!(request.per_page, PageRequest::MAX_PER_PAGE);
    }

    #[test]
    fn target_count_rejects_overflow() {
        let scan = NewScan {
            name: "office".into(),
            targets: vec!["10.0.0.1".into(), "10.0.0.2".into()],
        };
        assert_eq!(scan.total_targets().unwrap(), 2);

        let err = target_count(i32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, crate::SweepError::InputValidation(_)));
    }
}
