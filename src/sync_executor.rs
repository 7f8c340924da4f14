//! Sync Executor
//!
//! Consumer side of the dispatch queue: runs one job end to end. It resolves
//! the provider's discovery plugin, feeds every discovered record through the
//! hierarchy reconciler and secret rotator, and records exactly one terminal
//! status on the job whatever happens along the way.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, error, info, instrument, warn};

use crate::dispatch::JobDispatchMessage;
use crate::error::SyncError;
use crate::jobs::{JobLedger, JobStatus};
use crate::models::job::Model as Job;
use crate::models::{provider, trusted_account};
use crate::plugins::{DiscoveredRecord, PluginTransport, SyncRequest};
use crate::reconciler::{HierarchyReconciler, ReconciliationParams};
use crate::repositories::{ProviderRepository, TrustedAccountRepository};
use crate::secrets::{SchemaValidator, SecretRotator};

/// How a run ended when nothing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    Completed { records: usize },
    Canceled,
}

pub struct SyncExecutor {
    ledger: JobLedger,
    accounts: TrustedAccountRepository,
    providers: ProviderRepository,
    validator: Arc<dyn SchemaValidator>,
    transport: Arc<dyn PluginTransport>,
    reconciler: HierarchyReconciler,
    rotator: SecretRotator,
}

impl SyncExecutor {
    pub fn new(
        ledger: JobLedger,
        accounts: TrustedAccountRepository,
        providers: ProviderRepository,
        validator: Arc<dyn SchemaValidator>,
        transport: Arc<dyn PluginTransport>,
        reconciler: HierarchyReconciler,
        rotator: SecretRotator,
    ) -> Self {
        Self {
            ledger,
            accounts,
            providers,
            validator,
            transport,
            reconciler,
            rotator,
        }
    }

    /// Runs the job named by `message` and returns it in its final state.
    ///
    /// Failures of the run itself end up on the job; only a missing job or a
    /// ledger that cannot be written is returned as an error.
    #[instrument(skip_all, fields(job_id = %message.job_id, trusted_account_id = %message.trusted_account_id, domain_id = %message.domain_id))]
    pub async fn execute(&self, message: &JobDispatchMessage) -> Result<Job, SyncError> {
        let job_id = message.job_id;
        let job = self.ledger.get_job(&message.domain_id, job_id, None).await?;
        // a redelivered message for a job that already succeeded is acknowledged as is
        if job.job_status()? == JobStatus::Success {
            debug!("job already succeeded, skipping redelivery");
            return Ok(job);
        }

        let started = Instant::now();
        let status = match self.run(message).await {
            Ok(RunOutcome::Completed { records }) => {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
                self.ledger.mark_success(job_id).await?;
                histogram!("account_sync_job_duration_ms").record(elapsed_ms);
                info!(records, elapsed_ms, "sync job finished");
                "success"
            }
            Ok(RunOutcome::Canceled) => {
                self.ledger.mark_canceled(job_id).await?;
                info!("sync job canceled");
                "canceled"
            }
            Err(err) => {
                error!(error = %err, code = err.code(), "sync job failed");
                self.ledger.mark_failure(job_id, &err).await?;
                "failure"
            }
        };
        counter!("account_sync_jobs_total", "status" => status).increment(1);

        self.ledger.close_if_open(job_id).await
    }

    async fn run(&self, message: &JobDispatchMessage) -> Result<RunOutcome, SyncError> {
        let job_id = message.job_id;
        let (account, provider) = self.preflight(message).await?;

        if self.ledger.is_terminally_failed(job_id).await? {
            debug!("job invalidated before start");
            return Ok(RunOutcome::Canceled);
        }
        self.ledger.mark_in_progress(job_id).await?;

        let plugin_info = provider.plugin_info();
        let mut options: Map<String, JsonValue> = plugin_info.options.clone();
        options.extend(account.plugin_options());

        let endpoint = self
            .transport
            .resolve_endpoint(&plugin_info, &message.domain_id)
            .await?;
        self.transport.init(&endpoint, &options).await?;

        let request = SyncRequest {
            options,
            secret_data: message.secret_data.clone(),
            domain_id: message.domain_id.clone(),
            schema_id: plugin_info.schema_id.clone(),
        };
        let response = self.transport.sync(&endpoint, &request).await?;
        debug!(plugin_id = %endpoint.plugin_id, records = response.results.len(), "plugin sync returned");

        let params = ReconciliationParams {
            scope: account
                .scope()
                .map_err(|e| SyncError::Reconciliation(e.to_string()))?,
            sync_options: account
                .sync_options()
                .map_err(|e| SyncError::Reconciliation(format!("invalid sync options: {e}")))?,
            domain_id: message.domain_id.clone(),
            workspace_id: account.workspace_id,
            trusted_account_id: account.id,
            trusted_secret_id: message.trusted_secret_id,
            provider: account.provider.clone(),
        };

        let mut records = 0;
        for record in &response.results {
            self.sync_record(record, &params).await.map_err(|err| match err {
                SyncError::Database(db) => SyncError::Reconciliation(format!(
                    "record {}: {db}",
                    record.resource_id
                )),
                other => other,
            })?;
            records += 1;
            counter!("account_sync_records_total").increment(1);
        }

        if self.ledger.is_terminally_failed(job_id).await? {
            warn!(records, "job canceled while running, discarding result");
            return Ok(RunOutcome::Canceled);
        }
        Ok(RunOutcome::Completed { records })
    }

    /// Loads the account and provider and checks the account's schema exists.
    async fn preflight(
        &self,
        message: &JobDispatchMessage,
    ) -> Result<(trusted_account::Model, provider::Model), SyncError> {
        let account = self
            .accounts
            .get(&message.domain_id, message.trusted_account_id)
            .await?;
        self.validator
            .get_schema(&account.secret_schema_id, &message.domain_id)
            .await?;
        let provider = self.providers.get(&account.provider).await?;
        Ok((account, provider))
    }

    async fn sync_record(
        &self,
        record: &DiscoveredRecord,
        params: &ReconciliationParams,
    ) -> Result<(), SyncError> {
        let Some(account) = self.reconciler.reconcile(record, params).await? else {
            return Ok(());
        };

        if let Some(secret_data) = record.secret_material() {
            self.rotator
                .rotate(
                    account,
                    secret_data,
                    record.secret_schema_id.as_deref(),
                    params.trusted_secret_id,
                )
                .await?;
        }
        Ok(())
    }
}
