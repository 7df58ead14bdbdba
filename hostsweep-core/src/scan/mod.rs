//! Scan orchestration: submission, batch workers, the synchronous ad-hoc
//! scanner and the dashboard read side.

pub mod adhoc;
pub mod batch;
pub mod handler;
pub mod partition;
pub mod queries;
pub mod submission;

pub use adhoc::{AdhocRangeScanner, AdhocReport, LiveHost, TargetDiagnostic};
pub use batch::{BatchOutcome, BatchScanWorker};
pub use handler::ScanJobHandler;
pub use partition::partition_targets;
pub use queries::{ScanDetails, ScanQueryService};
pub use submission::{ScanSubmissionService, SubmissionReceipt, SubmitScan};
