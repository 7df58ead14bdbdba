use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{error, info, instrument, warn};

use super::publisher::{ArtifactPublisher, PublishedReport};
use super::renderer::{RenderRequest, ReportRenderer};
use super::{report_file_name, work_dir_for};
use crate::database::ScanStore;
use crate::error::{Result, SweepError};
use crate::types::{ReportUpdate, ScanId, ScanResult};

/// What one generation run ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The scan was gone; nothing was written.
    ScanMissing,
    NoResults,
    Ready(PublishedReport),
    Failed { error: String },
}

pub struct ReportGenerator {
    store: ScanStore,
    renderer: Arc<dyn ReportRenderer>,
    publisher: ArtifactPublisher,
    work_dir: PathBuf,
    branding: Option<PathBuf>,
}

impl std::fmt::Debug for ReportGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportGenerator")
            .field("store", &self.store)
            .field(
                "renderer",
                &std::any::type_name_of_val(self.renderer.as_ref()),
            )
            .field("publisher", &self.publisher)
            .field("work_dir", &self.work_dir)
            .field("branding", &self.branding)
            .finish()
    }
}

impl ReportGenerator {
    pub fn new(
        store: ScanStore,
        renderer: Arc<dyn ReportRenderer>,
        publisher: ArtifactPublisher,
        work_dir: impl Into<PathBuf>,
        branding: Option<PathBuf>,
    ) -> Self {
        Self {
            store,
            renderer,
            publisher,
            work_dir: work_dir.into(),
            branding,
        }
    }

    /// Run one generation for `scan_id` and record the outcome on the scan.
    ///
    /// Every failure after the scan is loaded ends as `failed` with the error
    /// text; only a failure to record that outcome is returned as `Err`.
    #[instrument(skip(self), fields(scan_id = %scan_id))]
    pub async fn generate(&self, scan_id: ScanId) -> Result<ReportOutcome> {
        let outcome = match self.try_generate(scan_id).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let error = failure_text(&err);
                error!(%scan_id, error = %error, "report generation failed");
                ReportOutcome::Failed { error }
            }
        };

        let update = match &outcome {
            ReportOutcome::ScanMissing => return Ok(outcome),
            ReportOutcome::NoResults => ReportUpdate::NoResults,
            ReportOutcome::Ready(published) => ReportUpdate::Ready {
                path: published.path.display().to_string(),
                url: published.url.clone(),
            },
            ReportOutcome::Failed { error } => ReportUpdate::Failed {
                error: error.clone(),
            },
        };
        self.store.scans.set_report(scan_id, update).await?;
        Ok(outcome)
    }

    async fn try_generate(&self, scan_id: ScanId) -> Result<ReportOutcome> {
        if self.store.scans.get(scan_id).await?.is_none() {
            warn!(%scan_id, "scan not found; skipping report");
            return Ok(ReportOutcome::ScanMissing);
        }

        let results = self.store.results.list_for_scan(scan_id).await?;
        if results.is_empty() {
            info!(%scan_id, "no results to report");
            return Ok(ReportOutcome::NoResults);
        }

        let dir = work_dir_for(&self.work_dir, scan_id);
        tokio::fs::create_dir_all(&dir).await?;

        let mut inputs = Vec::with_capacity(results.len());
        for (index, result) in results.iter().enumerate() {
            let path = dir.join(format!("result_{index}.json"));
            let body = serde_json::to_vec_pretty(&payload_for(result))?;
            tokio::fs::write(&path, body).await?;
            inputs.push(path);
        }

        let request = RenderRequest {
            inputs,
            output: dir.join(report_file_name(scan_id)),
            branding: self.branding.clone(),
        };
        info!(%scan_id, inputs = request.inputs.len(), "rendering report");
        let artifact = self.renderer.render(&request).await?;

        let published = self.publisher.publish(scan_id, &artifact).await?;
        info!(%scan_id, url = %published.url, "report ready");
        Ok(ReportOutcome::Ready(published))
    }
}

/// Payload written for a result; empty payloads get a placeholder that still
/// identifies the row.
fn payload_for(result: &ScanResult) -> Value {
    match &result.data {
        Some(data) if !is_blank(data) => data.clone(),
        _ => json!({ "note": "no data", "id": result.id }),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Renderer errors are recorded verbatim (stderr, `pdf_not_generated`).
fn failure_text(err: &SweepError) -> String {
    match err {
        SweepError::Render(render) => render.to_string(),
        other => other.to_string(),
    }
}
