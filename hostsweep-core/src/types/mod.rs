pub mod ids;
pub mod records;
pub mod status;

pub use ids::{ResultId, ScanId, TargetId};
pub use records::{
    NewScan, NewScanResult, Page, PageRequest, ReportUpdate, Scan, ScanResult,
    ScanTarget, TargetRef,
};
pub use status::{ReportStatus, ScanStatus, TargetStatus};
