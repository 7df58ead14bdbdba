//! Synchronous range scanning: probe every expression right away and fold
//! the answers into one deduplicated host list. Nothing is persisted.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::submission::validate_targets;
use crate::discovery::{DiscoveryClient, ProbeError};
use crate::error::Result;
use crate::extract::ResultExtractor;

/// A live address and every expression that reported it, first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveHost {
    pub ip: String,
    pub target_sources: Vec<String>,
}

/// Per-target record of what the backend said.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TargetDiagnostic {
    Success {
        target: String,
        response: Value,
    },
    Failure {
        target: String,
        error: bool,
        /// `None` when no response arrived at all.
        status: Option<u16>,
        body: String,
    },
}

impl TargetDiagnostic {
    fn failure(target: &str, err: &ProbeError) -> Self {
        let body = match err {
            ProbeError::Status { body, .. } => body.clone(),
            other => other.to_string(),
        };
        TargetDiagnostic::Failure {
            target: target.to_string(),
            error: true,
            status: err.status_code(),
            body,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TargetDiagnostic::Failure { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdhocReport {
    pub live: Vec<LiveHost>,
    pub count: usize,
    pub all: Vec<TargetDiagnostic>,
}

/// Address-keyed index that remembers insertion order.
#[derive(Default)]
struct LiveHostIndex {
    positions: HashMap<String, usize>,
    hosts: Vec<LiveHost>,
}

impl LiveHostIndex {
    fn record(&mut self, ip: String, source: &str) {
        match self.positions.get(&ip) {
            Some(&position) => {
                let sources = &mut self.hosts[position].target_sources;
                if !sources.iter().any(|existing| existing == source) {
                    sources.push(source.to_string());
                }
            }
            None => {
                self.positions.insert(ip.clone(), self.hosts.len());
                self.hosts.push(LiveHost {
                    ip,
                    target_sources: vec![source.to_string()],
                });
            }
        }
    }

    fn into_hosts(self) -> Vec<LiveHost> {
        self.hosts
    }
}

pub struct AdhocRangeScanner {
    client: Arc<dyn DiscoveryClient>,
    extractor: Arc<ResultExtractor>,
}

impl std::fmt::Debug for AdhocRangeScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdhocRangeScanner")
            .field("extractor", &self.extractor)
            .finish_non_exhaustive()
    }
}

impl AdhocRangeScanner {
    pub fn new(
        client: Arc<dyn DiscoveryClient>,
        extractor: Arc<ResultExtractor>,
    ) -> Self {
        Self { client, extractor }
    }

    /// Probe `targets` one at a time. Individual failures end up in the
    /// diagnostics; only invalid input fails the whole call.
    #[instrument(skip_all, fields(targets = targets.len()))]
    pub async fn scan(&self, targets: Vec<String>) -> Result<AdhocReport> {
        let targets = validate_targets(targets)?;
        let mut index = LiveHostIndex::default();
        let mut diagnostics = Vec::with_capacity(targets.len());

        for target in &targets {
            match self.client.probe(target).await {
                Ok(response) => {
                    for ip in self.extractor.extract(&response).into_addresses() {
                        index.record(ip, target);
                    }
                    diagnostics.push(TargetDiagnostic::Success {
                        target: target.clone(),
                        response,
                    });
                }
                Err(err) => {
                    warn!(target = %target, error = %err, "ad-hoc probe failed");
                    diagnostics.push(TargetDiagnostic::failure(target, &err));
                }
            }
        }

        let live = index.into_hosts();
        info!(
            live = live.len(),
            failed = diagnostics.iter().filter(|d| d.is_failure()).count(),
            "ad-hoc scan finished"
        );
        Ok(AdhocReport {
            count: live.len(),
            live,
            all: diagnostics,
        })
    }
}
