//! Boundary to the external discovery/probing backends.
//!
//! The backends own the actual network sweep; this side only POSTs
//! `{"target": <expression>}` and hands the decoded JSON to the extractor.

pub mod http;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use http::HttpDiscoveryClient;

/// Failure of a single probe call. Always isolated to the target it was
/// issued for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The backend answered with a non-success status.
    #[error("HTTP {status} {body}")]
    Status { status: u16, body: String },

    /// Connection, TLS or protocol failure before a response arrived.
    #[error("{0}")]
    Transport(String),

    /// The backend answered 2xx but the body was not JSON.
    #[error("invalid JSON response: {0}")]
    Decode(String),
}

impl ProbeError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProbeError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    /// Probe one target expression and return the backend's JSON response.
    async fn probe(&self, target: &str) -> Result<Value, ProbeError>;
}
