//! Job creation
//!
//! Turns a trusted account into a PENDING job plus a queued dispatch message,
//! and runs the hourly sweep over every due account.

use std::sync::Arc;

use chrono::{Timelike, Utc};
use metrics::counter;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use crate::dispatch::{DispatchQueue, JobDispatchMessage};
use crate::error::SyncError;
use crate::jobs::{JobLedger, JobStatus};
use crate::models::job::{ALL_WORKSPACES, Model as Job};
use crate::models::trusted_account::{self, ScopeKind};
use crate::repositories::{ProviderRepository, TrustedAccountRepository};
use crate::schedule::select_due_accounts;
use crate::secrets::{SchemaValidator, SecretPayload, SecretUsage, SecretVault};

/// Outcome of one hourly sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    /// UTC hour the sweep ran for
    pub hour: u8,
    /// Accounts whose schedule included the hour
    pub due: usize,
    /// Jobs created and dispatched
    pub created: usize,
    /// Accounts whose job failed to be created or dispatched
    pub failed: usize,
}

#[derive(Clone)]
pub struct JobService {
    ledger: JobLedger,
    queue: DispatchQueue,
    accounts: TrustedAccountRepository,
    providers: ProviderRepository,
    vault: Arc<dyn SecretVault>,
    validator: Arc<dyn SchemaValidator>,
}

impl JobService {
    pub fn new(
        ledger: JobLedger,
        queue: DispatchQueue,
        accounts: TrustedAccountRepository,
        providers: ProviderRepository,
        vault: Arc<dyn SecretVault>,
        validator: Arc<dyn SchemaValidator>,
    ) -> Self {
        Self {
            ledger,
            queue,
            accounts,
            providers,
            vault,
            validator,
        }
    }

    pub fn ledger(&self) -> &JobLedger {
        &self.ledger
    }

    pub fn accounts(&self) -> &TrustedAccountRepository {
        &self.accounts
    }

    /// Creates and dispatches one job for `account`.
    ///
    /// A duplicate or a failed push is recorded on the returned job as
    /// FAILURE rather than surfaced as an error.
    #[instrument(skip_all, fields(trusted_account_id = %account.id, domain_id = %account.domain_id))]
    pub async fn create_service_account_job(
        &self,
        account: &trusted_account::Model,
        job_options: JsonValue,
    ) -> Result<Job, SyncError> {
        let workspace_scope = workspace_scope(account)?;

        let provider = self.providers.get(&account.provider).await?;
        let plugin_id = provider.plugin_info().plugin_id.ok_or_else(|| {
            SyncError::PluginInvocation(format!(
                "provider {} has no plugin binding",
                provider.provider
            ))
        })?;

        let secret_data = self.resolve_trusted_secret(account).await;

        let job = self
            .ledger
            .create_job(account, &workspace_scope, &plugin_id, job_options.clone())
            .await?;

        if let Some(existing_job_id) = self.ledger.duplicate_of(&job, Utc::now()).await? {
            warn!(job_id = %job.id, existing_job_id = %existing_job_id, "duplicate job, not dispatching");
            counter!("account_sync_jobs_duplicate_total").increment(1);
            let err = SyncError::DuplicateJob { existing_job_id };
            return self.ledger.mark_failure(job.id, &err).await;
        }

        let message = JobDispatchMessage {
            job_id: job.id,
            trusted_account_id: account.id,
            trusted_secret_id: account.trusted_secret_id,
            secret_data,
            workspace_id: workspace_scope,
            domain_id: account.domain_id.clone(),
            options: job_options,
        };
        if let Err(err) = self.queue.push(&message).await {
            error!(job_id = %job.id, error = %err, "failed to dispatch job");
            return self.ledger.mark_failure(job.id, &err).await;
        }

        Ok(job)
    }

    /// Creates jobs for every account due at `current_hour` (default: now, UTC).
    ///
    /// Accounts are processed one after another; a failing account is logged
    /// and counted, never propagated.
    #[instrument(skip(self))]
    pub async fn create_jobs_by_trusted_account(
        &self,
        current_hour: Option<u8>,
    ) -> Result<SweepReport, SyncError> {
        let hour = current_hour.unwrap_or_else(|| Utc::now().hour() as u8);
        let candidates = self.accounts.list_schedule_enabled().await?;
        let due = select_due_accounts(&candidates, hour);

        let mut report = SweepReport {
            hour,
            due: due.len(),
            ..Default::default()
        };

        for account in due {
            match self.create_service_account_job(account, json!({})).await {
                Ok(job) if job.status == JobStatus::Failure.as_str() => report.failed += 1,
                Ok(_) => report.created += 1,
                Err(err) => {
                    report.failed += 1;
                    error!(
                        trusted_account_id = %account.id,
                        domain_id = %account.domain_id,
                        error = %err,
                        code = err.code(),
                        "failed to create sync job for trusted account"
                    );
                }
            }
        }

        counter!("account_sync_sweep_jobs_created_total").increment(report.created as u64);
        counter!("account_sync_sweep_failures_total").increment(report.failed as u64);
        info!(
            hour = report.hour,
            due = report.due,
            created = report.created,
            failed = report.failed,
            "schedule sweep completed"
        );
        Ok(report)
    }

    /// Trusted credential payload, or an empty one when it cannot be resolved.
    async fn resolve_trusted_secret(&self, account: &trusted_account::Model) -> SecretPayload {
        match self.fetch_trusted_secret(account).await {
            Ok(data) => data,
            Err(err) => {
                let err = match err {
                    SyncError::SecretResolution(_) => err,
                    other => SyncError::SecretResolution(other.to_string()),
                };
                warn!(
                    trusted_account_id = %account.id,
                    error = %err,
                    "continuing with an empty secret payload"
                );
                SecretPayload::new()
            }
        }
    }

    async fn fetch_trusted_secret(
        &self,
        account: &trusted_account::Model,
    ) -> Result<SecretPayload, SyncError> {
        let Some(secret_id) = account.trusted_secret_id else {
            return Ok(SecretPayload::new());
        };

        let data = self
            .vault
            .get_secret_data(secret_id, &account.domain_id)
            .await?;
        if !data.is_empty() {
            self.validator
                .validate_secret_data(
                    &account.secret_schema_id,
                    &account.domain_id,
                    &data,
                    SecretUsage::Secret,
                )
                .await?;
        }
        Ok(data)
    }
}

/// `*` for domain accounts, the owning workspace otherwise.
pub fn workspace_scope(account: &trusted_account::Model) -> Result<String, SyncError> {
    let scope = account
        .scope()
        .map_err(|e| SyncError::Reconciliation(e.to_string()))?;
    match scope {
        ScopeKind::Domain => Ok(ALL_WORKSPACES.to_string()),
        ScopeKind::Workspace => account
            .workspace_id
            .map(|id| id.to_string())
            .ok_or_else(|| {
                SyncError::Reconciliation(format!(
                    "workspace trusted account {} has no workspace",
                    account.id
                ))
            }),
    }
}
