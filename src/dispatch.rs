//! # Dispatch Queue
//!
//! Durable hand-off between job creation and job execution. A created job is
//! pushed as a sealed [`JobDispatchMessage`] into `job_dispatches`; the
//! [`DispatchWorker`] claims messages in batches, runs them through the
//! [`SyncExecutor`] and marks them done. A claim that is never completed is
//! redelivered after the visibility timeout, so execution is at-least-once.

use std::sync::Arc;

use chrono::Duration;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::task::JoinSet;
use tokio::time::{Duration as TokioDuration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::ExecutorConfig;
use crate::crypto::{self, CryptoKey};
use crate::error::{SyncError, is_unique_violation};
use crate::repositories::JobDispatchRepository;
use crate::secrets::SecretPayload;
use crate::sync_executor::SyncExecutor;
use crate::telemetry::{self, TraceContext};

/// Everything the executor needs to run one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDispatchMessage {
    pub job_id: Uuid,
    pub trusted_account_id: Uuid,
    pub trusted_secret_id: Option<Uuid>,
    #[serde(default)]
    pub secret_data: SecretPayload,
    /// Workspace uuid or `*`
    pub workspace_id: String,
    pub domain_id: String,
    #[serde(default)]
    pub options: JsonValue,
}

/// A claimed, decrypted message.
#[derive(Debug, Clone)]
pub struct ClaimedDispatch {
    pub id: Uuid,
    pub attempts: i32,
    pub message: JobDispatchMessage,
}

#[derive(Clone)]
pub struct DispatchQueue {
    dispatches: JobDispatchRepository,
    crypto_key: CryptoKey,
    visibility_timeout: Duration,
}

impl DispatchQueue {
    pub fn new(
        dispatches: JobDispatchRepository,
        crypto_key: CryptoKey,
        visibility_timeout: Duration,
    ) -> Self {
        Self {
            dispatches,
            crypto_key,
            visibility_timeout,
        }
    }

    /// Enqueues `message`; a job that already has an open message keeps it.
    pub async fn push(&self, message: &JobDispatchMessage) -> Result<Uuid, SyncError> {
        let id = Uuid::new_v4();
        let payload = crypto::seal_json(&self.crypto_key, &crypto::dispatch_aad(id), message)?;

        match self.dispatches.insert(id, message.job_id, payload).await {
            Ok(row) => {
                counter!("account_sync_dispatch_pushed_total").increment(1);
                debug!(dispatch_id = %row.id, job_id = %message.job_id, "queued job dispatch");
                Ok(row.id)
            }
            Err(SyncError::Database(err)) if is_unique_violation(&err) => {
                let existing = self
                    .dispatches
                    .find_open_for_job(message.job_id)
                    .await?
                    .ok_or(SyncError::Database(err))?;
                debug!(dispatch_id = %existing.id, job_id = %message.job_id, "job already queued");
                Ok(existing.id)
            }
            Err(err) => Err(err),
        }
    }

    /// Claims up to `batch` messages.
    ///
    /// Rows whose payload cannot be opened are completed and dropped so they
    /// are not redelivered forever.
    pub async fn claim(&self, batch: u64) -> Result<Vec<ClaimedDispatch>, SyncError> {
        let rows = self.dispatches.claim(batch, self.visibility_timeout).await?;
        let mut claimed = Vec::with_capacity(rows.len());

        for row in rows {
            let aad = crypto::dispatch_aad(row.id);
            match crypto::open_json::<JobDispatchMessage>(&self.crypto_key, &aad, &row.payload) {
                Ok(message) => claimed.push(ClaimedDispatch {
                    id: row.id,
                    attempts: row.attempts,
                    message,
                }),
                Err(err) => {
                    error!(dispatch_id = %row.id, job_id = %row.job_id, error = %err, "dropping unreadable dispatch");
                    counter!("account_sync_dispatch_poisoned_total").increment(1);
                    self.dispatches.complete(row.id).await?;
                }
            }
        }
        Ok(claimed)
    }

    pub async fn complete(&self, id: Uuid) -> Result<(), SyncError> {
        self.dispatches.complete(id).await?;
        Ok(())
    }
}

/// Consumer loop executing claimed dispatches.
pub struct DispatchWorker {
    queue: DispatchQueue,
    executor: Arc<SyncExecutor>,
    config: ExecutorConfig,
}

impl DispatchWorker {
    pub fn new(queue: DispatchQueue, executor: Arc<SyncExecutor>, config: ExecutorConfig) -> Self {
        Self {
            queue,
            executor,
            config,
        }
    }

    /// Poll until `shutdown` fires.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            tick_ms = self.config.tick_ms,
            concurrency = self.config.concurrency,
            "Starting dispatch worker"
        );
        let tick_interval = TokioDuration::from_millis(self.config.tick_ms);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Dispatch worker shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    let tick_started = Instant::now();
                    match self.tick().await {
                        Ok(0) => {}
                        Ok(count) => debug!(count, "processed dispatches"),
                        Err(err) => error!(error = %err, "Dispatch worker tick failed"),
                    }
                    histogram!("account_sync_dispatch_tick_duration_ms")
                        .record(tick_started.elapsed().as_secs_f64() * 1_000.0);
                }
            }
        }

        info!("Dispatch worker stopped");
    }

    /// Claims one batch and runs it to completion; returns the batch size.
    pub async fn tick(&self) -> Result<usize, SyncError> {
        let claimed = self.queue.claim(self.config.claim_batch).await?;
        if claimed.is_empty() {
            return Ok(0);
        }
        let count = claimed.len();

        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for dispatch in claimed {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let queue = self.queue.clone();
            let executor = self.executor.clone();

            tasks.spawn(async move {
                let _permit = permit;
                run_dispatch(&queue, &executor, dispatch).await;
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "dispatch task panicked");
            }
        }
        Ok(count)
    }
}

async fn run_dispatch(queue: &DispatchQueue, executor: &SyncExecutor, dispatch: ClaimedDispatch) {
    let job_id = dispatch.message.job_id;
    if dispatch.attempts > 1 {
        warn!(dispatch_id = %dispatch.id, job_id = %job_id, attempts = dispatch.attempts, "redelivered dispatch");
    }

    let context = TraceContext::from_id(job_id.to_string());
    let outcome = telemetry::with_trace_context(context, executor.execute(&dispatch.message)).await;
    let settled = match outcome {
        Ok(job) => {
            debug!(dispatch_id = %dispatch.id, job_id = %job_id, status = %job.status, "dispatch executed");
            true
        }
        Err(SyncError::NotFound { resource, id }) => {
            warn!(dispatch_id = %dispatch.id, job_id = %job_id, resource, id = %id, "dispatch references a missing record");
            true
        }
        Err(err) => {
            // leave the claim open; it is redelivered after the visibility timeout
            error!(dispatch_id = %dispatch.id, job_id = %job_id, error = %err, "dispatch execution failed");
            false
        }
    };

    if settled {
        if let Err(err) = queue.complete(dispatch.id).await {
            error!(dispatch_id = %dispatch.id, error = %err, "failed to complete dispatch");
        }
    }
}
