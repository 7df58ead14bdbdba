use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ScanId, TargetRef};

/// Unique identifier for queued jobs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    ScanBatch,
    GenerateReport,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::ScanBatch => write!(f, "scan_batch"),
            JobKind::GenerateReport => write!(f, "generate_report"),
        }
    }
}

/// Structured payload per job kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum JobPayload {
    ScanBatch(ScanBatchJob),
    GenerateReport(GenerateReportJob),
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::ScanBatch(_) => JobKind::ScanBatch,
            JobPayload::GenerateReport(_) => JobKind::GenerateReport,
        }
    }

    pub fn scan_id(&self) -> ScanId {
        match self {
            JobPayload::ScanBatch(job) => job.scan_id,
            JobPayload::GenerateReport(job) => job.scan_id,
        }
    }
}

/// One group of a scan's targets, probed sequentially by a single worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanBatchJob {
    pub scan_id: ScanId,
    pub targets: Vec<TargetRef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerateReportJob {
    pub scan_id: ScanId,
}

/// A payload plus its delivery bookkeeping.
#[derive(Clone, Debug)]
pub struct JobRecord {
    pub id: JobId,
    pub payload: JobPayload,
    /// Attempts started so far, including the one in progress.
    pub attempts: u16,
    pub enqueued_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(payload: JobPayload) -> Self {
        Self {
            id: JobId::new(),
            payload,
            attempts: 0,
            enqueued_at: Utc::now(),
        }
    }
}
