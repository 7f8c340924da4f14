//! # Service Assembly
//!
//! Builds the orchestrator's object graph from configuration: repositories,
//! vault, validator, plugin transport, ledger, queue, job service and
//! executor. Every collaborator is constructed once here and handed down.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::Duration;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::crypto::CryptoKey;
use crate::dispatch::{DispatchQueue, DispatchWorker};
use crate::jobs::{JobLedger, JobService};
use crate::plugins::{HttpPluginTransport, PluginTransport};
use crate::reconciler::{HierarchyReconciler, Inventory};
use crate::repositories::{
    JobDispatchRepository, JobRepository, ProviderRepository, SchemaRepository, SecretRepository,
    ServiceAccountRepository, TrustedAccountRepository,
};
use crate::schedule::SyncScheduler;
use crate::secrets::{
    EncryptedSecretVault, RepositorySchemaValidator, SchemaValidator, SecretRotator, SecretVault,
};
use crate::sync_executor::SyncExecutor;

/// Shared handles of a running service.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub jobs: Arc<JobService>,
    pub executor: Arc<SyncExecutor>,
    pub queue: DispatchQueue,
}

impl Services {
    /// Wires the service with the HTTP plugin transport from `config.plugin`.
    pub fn from_config(config: AppConfig, db: DatabaseConnection) -> Result<Self> {
        let transport = HttpPluginTransport::from_config(&config.plugin)
            .context("failed to build plugin transport")?;
        Self::with_transport(config, Arc::new(db), Arc::new(transport))
    }

    pub fn with_transport(
        config: AppConfig,
        db: Arc<DatabaseConnection>,
        transport: Arc<dyn PluginTransport>,
    ) -> Result<Self> {
        let key_bytes = config
            .crypto_key
            .clone()
            .ok_or_else(|| anyhow!("ACCOUNT_SYNC_CRYPTO_KEY is required"))?;
        let crypto_key = CryptoKey::new(key_bytes).context("invalid crypto key")?;

        let vault: Arc<dyn SecretVault> = Arc::new(EncryptedSecretVault::new(
            SecretRepository::new(db.clone()),
            crypto_key.clone(),
        ));
        let validator: Arc<dyn SchemaValidator> = Arc::new(RepositorySchemaValidator::new(
            SchemaRepository::new(db.clone()),
        ));

        let ledger = JobLedger::new(
            JobRepository::new(db.clone()),
            Duration::minutes(config.jobs.duplicate_window_minutes),
        );
        let visibility_timeout_seconds =
            i64::try_from(config.executor.visibility_timeout_seconds).unwrap_or(i64::MAX);
        let queue = DispatchQueue::new(
            JobDispatchRepository::new(db.clone()),
            crypto_key,
            Duration::seconds(visibility_timeout_seconds),
        );
        let accounts = TrustedAccountRepository::new(db.clone());
        let providers = ProviderRepository::new(db.clone());

        let jobs = JobService::new(
            ledger.clone(),
            queue.clone(),
            accounts.clone(),
            providers.clone(),
            vault.clone(),
            validator.clone(),
        );

        let rotator = SecretRotator::new(
            vault,
            validator.clone(),
            ServiceAccountRepository::new(db.clone()),
        );
        let executor = SyncExecutor::new(
            ledger,
            accounts,
            providers,
            validator,
            transport,
            HierarchyReconciler::new(Inventory::new(db.clone())),
            rotator,
        );

        Ok(Self {
            config: Arc::new(config),
            db,
            jobs: Arc::new(jobs),
            executor: Arc::new(executor),
            queue,
        })
    }

    pub fn scheduler(&self) -> SyncScheduler {
        SyncScheduler::new(self.jobs.clone(), self.config.scheduler.clone())
    }

    pub fn dispatch_worker(&self) -> DispatchWorker {
        DispatchWorker::new(
            self.queue.clone(),
            self.executor.clone(),
            self.config.executor.clone(),
        )
    }
}
