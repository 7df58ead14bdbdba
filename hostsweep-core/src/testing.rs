//! Substitutes for the outbound boundaries, shared by unit tests and by
//! dependent crates through the `test-utils` feature.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::discovery::{DiscoveryClient, ProbeError};
use crate::error::{Result, SweepError};
use crate::orchestration::{JobId, JobPayload, JobQueue, ScanBatchJob};
use crate::report::{RenderError, RenderRequest, RenderedArtifact, ReportRenderer};

/// Discovery client answering from a canned table and recording every call.
/// Unknown targets fail with a transport error.
#[derive(Debug, Default)]
pub struct StubDiscoveryClient {
    responses: Mutex<HashMap<String, std::result::Result<Value, ProbeError>>>,
    calls: Mutex<Vec<String>>,
}

impl StubDiscoveryClient {
    pub fn respond(&self, target: &str, response: Value) {
        self.responses
            .lock()
            .insert(target.to_string(), Ok(response));
    }

    pub fn respond_err(&self, target: &str, error: ProbeError) {
        self.responses.lock().insert(target.to_string(), Err(error));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl DiscoveryClient for StubDiscoveryClient {
    async fn probe(&self, target: &str) -> std::result::Result<Value, ProbeError> {
        self.calls.lock().push(target.to_string());
        self.responses
            .lock()
            .get(target)
            .cloned()
            .unwrap_or_else(|| Err(ProbeError::Transport(format!("no stub for {target}"))))
    }
}

/// Queue that only records what was enqueued.
#[derive(Debug, Default)]
pub struct RecordingQueue {
    payloads: Mutex<Vec<JobPayload>>,
    closed: Mutex<bool>,
}

impl RecordingQueue {
    pub fn close(&self) {
        *self.closed.lock() = true;
    }

    pub fn payloads(&self) -> Vec<JobPayload> {
        self.payloads.lock().clone()
    }

    pub fn batches(&self) -> Vec<ScanBatchJob> {
        self.payloads()
            .into_iter()
            .filter_map(|payload| match payload {
                JobPayload::ScanBatch(job) => Some(job),
                JobPayload::GenerateReport(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl JobQueue for RecordingQueue {
    async fn enqueue(&self, payload: JobPayload) -> Result<JobId> {
        if *self.closed.lock() {
            return Err(SweepError::QueueClosed);
        }
        self.payloads.lock().push(payload);
        Ok(JobId::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubRendering {
    /// Write a small document at the requested output path.
    WriteOutput,
    /// Exit non-zero with this stderr.
    Fail(String),
    /// Exit cleanly without producing output.
    NoOutput,
}

/// Renderer that never shells out.
#[derive(Debug)]
pub struct StubRenderer {
    behaviour: StubRendering,
    requests: Mutex<Vec<RenderRequest>>,
}

impl StubRenderer {
    pub fn new(behaviour: StubRendering) -> Self {
        Self {
            behaviour,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RenderRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ReportRenderer for StubRenderer {
    async fn render(
        &self,
        request: &RenderRequest,
    ) -> std::result::Result<RenderedArtifact, RenderError> {
        self.requests.lock().push(request.clone());
        match &self.behaviour {
            StubRendering::WriteOutput => {
                tokio::fs::write(&request.output, b"%PDF-1.7 stub").await?;
                Ok(RenderedArtifact {
                    path: request.output.clone(),
                })
            }
            StubRendering::Fail(stderr) => Err(RenderError::ProcessFailed {
                code: Some(1),
                stderr: stderr.clone(),
            }),
            StubRendering::NoOutput => Err(RenderError::OutputMissing {
                path: request.output.clone(),
            }),
        }
    }
}
