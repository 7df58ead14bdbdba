use async_trait::async_trait;

use super::job::{JobId, JobPayload};
use crate::Result;

/// Producer side of the job runtime.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, payload: JobPayload) -> Result<JobId>;
}
