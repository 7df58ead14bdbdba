use std::path::PathBuf;

use tracing::debug;

use super::renderer::RenderedArtifact;
use super::{report_file_name, scan_dir_name};
use crate::error::{Result, SweepError};
use crate::types::ScanId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedReport {
    pub path: PathBuf,
    pub url: String,
}

/// Copies rendered reports into the publicly served tree
/// (`<public_dir>/reports/scan_<id>/`) and derives their URL.
#[derive(Debug, Clone)]
pub struct ArtifactPublisher {
    public_dir: PathBuf,
    base_url: String,
}

impl ArtifactPublisher {
    pub fn new(public_dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            public_dir: public_dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Relative URL path, e.g. `reports/scan_<id>/scan_<id>_report.pdf`.
    pub fn relative_path(scan_id: ScanId) -> String {
        format!(
            "reports/{}/{}",
            scan_dir_name(scan_id),
            report_file_name(scan_id)
        )
    }

    pub async fn publish(
        &self,
        scan_id: ScanId,
        artifact: &RenderedArtifact,
    ) -> Result<PublishedReport> {
        let relative = Self::relative_path(scan_id);
        let destination = self.public_dir.join(&relative);
        let parent = destination.parent().ok_or_else(|| {
            SweepError::Internal(format!(
                "report destination {} has no parent",
                destination.display()
            ))
        })?;

        tokio::fs::create_dir_all(parent).await?;
        tokio::fs::copy(&artifact.path, &destination).await?;
        debug!(
            %scan_id,
            from = %artifact.path.display(),
            to = %destination.display(),
            "report published"
        );

        Ok(PublishedReport {
            url: format!("{}/{relative}", self.base_url),
            path: destination,
        })
    }
}
