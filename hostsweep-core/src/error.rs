use thiserror::Error;

use crate::discovery::ProbeError;
use crate::report::RenderError;
use crate::types::ScanId;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("Scan not found: {0}")]
    ScanNotFound(ScanId),

    #[error("Discovery call failed: {0}")]
    Transport(#[from] ProbeError),

    #[error("Report rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Job queue closed")]
    QueueClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SweepError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InputValidation(message.into())
    }

    /// Whether a job failing with this error is worth another attempt.
    ///
    /// Missing scans and bad input never heal on their own; store and IO
    /// failures usually do.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            SweepError::InputValidation(_)
                | SweepError::ScanNotFound(_)
                | SweepError::Serialization(_)
                | SweepError::QueueClosed
        )
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;
