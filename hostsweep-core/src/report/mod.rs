//! Asynchronous report generation.
//!
//! Triggering a report only records `queued` and enqueues a job; the job
//! writes every persisted result to disk, hands the files to a
//! [`ReportRenderer`], and publishes the rendered document. Callers poll
//! [`ReportService::status`] for the outcome.

pub mod generator;
pub mod publisher;
pub mod renderer;
pub mod service;

pub use generator::{ReportGenerator, ReportOutcome};
pub use publisher::{ArtifactPublisher, PublishedReport};
pub use renderer::{
    ProcessRenderer, RenderError, RenderRequest, RenderedArtifact,
    ReportRenderer,
};
pub use service::{ReportService, ReportStatusView, ReportTicket};

use std::path::{Path, PathBuf};

use crate::types::ScanId;

/// Directory name shared by the work area and the public tree.
pub fn scan_dir_name(scan_id: ScanId) -> String {
    format!("scan_{scan_id}")
}

pub fn report_file_name(scan_id: ScanId) -> String {
    format!("scan_{scan_id}_report.pdf")
}

/// `<work_dir>/scan_<id>`
pub fn work_dir_for(work_dir: &Path, scan_id: ScanId) -> PathBuf {
    work_dir.join(scan_dir_name(scan_id))
}
