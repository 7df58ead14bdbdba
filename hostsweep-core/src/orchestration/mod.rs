//! In-process job runtime.
//!
//! Batch scans and report generation run as jobs: a payload is enqueued
//! through [`JobQueue`], picked up by one of the runtime's workers and handed
//! to a [`JobHandler`]. Failed jobs are retried with exponential backoff until
//! the attempt budget runs out, after which they are dead-lettered.

pub mod config;
pub mod dispatch;
pub mod job;
pub mod queue;
pub mod runtime;

pub use config::{QueueConfig, RetryConfig};
pub use dispatch::{CompletionOutcome, JobHandler};
pub use job::{
    GenerateReportJob, JobId, JobKind, JobPayload, JobRecord, ScanBatchJob,
};
pub use queue::JobQueue;
pub use runtime::{InProcJobRuntime, RuntimeStats};
