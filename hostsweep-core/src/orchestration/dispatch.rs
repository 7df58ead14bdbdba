use async_trait::async_trait;

use super::job::JobRecord;

/// Outcome of one job attempt as reported by a [`JobHandler`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CompletionOutcome {
    Completed,
    /// Worth another attempt if the budget allows.
    Retry { error: String },
    /// Never retried.
    DeadLetter { error: String },
}

/// Executes dequeued jobs for the runtime's workers.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &JobRecord) -> CompletionOutcome;
}
