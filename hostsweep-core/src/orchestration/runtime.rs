use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::QueueConfig;
use super::dispatch::{CompletionOutcome, JobHandler};
use super::job::{JobId, JobPayload, JobRecord};
use super::queue::JobQueue;
use crate::error::{Result, SweepError};

/// Point-in-time view of the runtime counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeStats {
    pub workers: usize,
    pub enqueued: u64,
    pub completed: u64,
    pub retried: u64,
    pub dead_lettered: u64,
    /// Jobs accepted but not yet completed or dead-lettered, including
    /// those waiting out a retry delay.
    pub outstanding: u64,
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    completed: AtomicU64,
    retried: AtomicU64,
    dead_lettered: AtomicU64,
    outstanding: AtomicU64,
}

struct Shared {
    config: QueueConfig,
    handler: Arc<dyn JobHandler>,
    sender: mpsc::UnboundedSender<JobRecord>,
    receiver: AsyncMutex<mpsc::UnboundedReceiver<JobRecord>>,
    counters: Counters,
    idle: Notify,
    shutdown: CancellationToken,
}

impl Shared {
    fn settle(&self) {
        if self.counters.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Channel-backed job runtime with a fixed worker pool.
#[derive(Clone)]
pub struct InProcJobRuntime {
    shared: Arc<Shared>,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl fmt::Debug for InProcJobRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcJobRuntime")
            .field("config", &self.shared.config)
            .field("handler", &type_name_of_val(self.shared.handler.as_ref()))
            .field("stats", &self.stats())
            .finish()
    }
}

impl InProcJobRuntime {
    /// Spawn `config.workers` workers on the current tokio runtime.
    pub fn start(config: QueueConfig, handler: Arc<dyn JobHandler>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker_count = config.workers.max(1);
        let shared = Arc::new(Shared {
            config,
            handler,
            sender,
            receiver: AsyncMutex::new(receiver),
            counters: Counters::default(),
            idle: Notify::new(),
            shutdown: CancellationToken::new(),
        });

        let handles = (0..worker_count)
            .map(|index| tokio::spawn(worker_loop(shared.clone(), index)))
            .collect();
        info!(workers = worker_count, "job runtime started");

        Self {
            shared,
            workers: Arc::new(Mutex::new(handles)),
        }
    }

    pub fn stats(&self) -> RuntimeStats {
        let counters = &self.shared.counters;
        RuntimeStats {
            workers: self.shared.config.workers.max(1),
            enqueued: counters.enqueued.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            retried: counters.retried.load(Ordering::Relaxed),
            dead_lettered: counters.dead_lettered.load(Ordering::Relaxed),
            outstanding: counters.outstanding.load(Ordering::SeqCst),
        }
    }

    /// Resolves once every accepted job has completed or been dead-lettered.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.shared.counters.outstanding.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting jobs and wait for running attempts to finish. Queued
    /// jobs and pending retries are dropped.
    pub async fn shutdown(&self) {
        if self.shared.shutdown.is_cancelled() {
            return;
        }
        self.shared.shutdown.cancel();

        let handles: Vec<_> = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if let Err(err) = handle.await {
                error!(error = %err, "job worker panicked");
            }
        }

        let mut dropped = 0usize;
        {
            let mut receiver = self.shared.receiver.lock().await;
            receiver.close();
            while receiver.try_recv().is_ok() {
                dropped += 1;
                self.shared.settle();
            }
        }
        if dropped > 0 {
            warn!(dropped, "job runtime stopped with queued jobs");
        }
        info!("job runtime stopped");
    }
}

#[async_trait]
impl JobQueue for InProcJobRuntime {
    async fn enqueue(&self, payload: JobPayload) -> Result<JobId> {
        if self.shared.shutdown.is_cancelled() {
            return Err(SweepError::QueueClosed);
        }

        let record = JobRecord::new(payload);
        let id = record.id;
        let kind = record.payload.kind();
        let scan_id = record.payload.scan_id();

        self.shared
            .counters
            .outstanding
            .fetch_add(1, Ordering::SeqCst);
        if self.shared.sender.send(record).is_err() {
            self.shared.settle();
            return Err(SweepError::QueueClosed);
        }
        self.shared.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        debug!(job_id = %id, %kind, %scan_id, "job enqueued");
        Ok(id)
    }
}

async fn worker_loop(shared: Arc<Shared>, index: usize) {
    debug!(worker = index, "job worker started");
    loop {
        let next = {
            let mut receiver = shared.receiver.lock().await;
            tokio::select! {
                biased;
                _ = shared.shutdown.cancelled() => None,
                job = receiver.recv() => job,
            }
        };
        let Some(job) = next else { break };
        run_attempt(&shared, job).await;
    }
    debug!(worker = index, "job worker stopped");
}

async fn run_attempt(shared: &Arc<Shared>, mut job: JobRecord) {
    job.attempts = job.attempts.saturating_add(1);
    let kind = job.payload.kind();
    let max_attempts = shared.config.retry.max_attempts.max(1);

    let outcome = shared.handler.handle(&job).await;
    let counters = &shared.counters;
    match outcome {
        CompletionOutcome::Completed => {
            counters.completed.fetch_add(1, Ordering::Relaxed);
            debug!(job_id = %job.id, %kind, attempt = job.attempts, "job completed");
            shared.settle();
        }
        CompletionOutcome::Retry { error } if job.attempts < max_attempts => {
            counters.retried.fetch_add(1, Ordering::Relaxed);
            let delay = shared.config.retry.delay_for_attempt(job.attempts);
            warn!(
                job_id = %job.id,
                %kind,
                attempt = job.attempts,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "job failed; retrying"
            );
            schedule_retry(shared.clone(), job, delay);
        }
        CompletionOutcome::Retry { error }
        | CompletionOutcome::DeadLetter { error } => {
            counters.dead_lettered.fetch_add(1, Ordering::Relaxed);
            error!(
                job_id = %job.id,
                %kind,
                scan_id = %job.payload.scan_id(),
                attempt = job.attempts,
                error = %error,
                "job dead-lettered"
            );
            shared.settle();
        }
    }
}

fn schedule_retry(shared: Arc<Shared>, job: JobRecord, delay: std::time::Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = shared.shutdown.cancelled() => {
                warn!(job_id = %job.id, "dropping pending retry on shutdown");
                shared.settle();
            }
            _ = tokio::time::sleep(delay) => {
                let id = job.id;
                if shared.sender.send(job).is_err() {
                    warn!(job_id = %id, "queue closed before retry");
                    shared.settle();
                }
            }
        }
    });
}
