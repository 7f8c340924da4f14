//! Test utilities for database-backed tests.
//!
//! In-memory SQLite with every migration applied, fixture helpers for the
//! provider catalog and trusted accounts, and a scripted plugin transport.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use account_sync::app::Services;
use account_sync::config::AppConfig;
use account_sync::crypto::CryptoKey;
use account_sync::error::SyncError;
use account_sync::jobs::JobLedger;
use account_sync::models::provider::PluginInfo;
use account_sync::models::trusted_account::{self, ScopeKind, Schedule};
use account_sync::plugins::{
    DiscoveredRecord, LocationNode, PluginEndpoint, PluginTransport, SyncRequest, SyncResponse,
};
use account_sync::repositories::{
    JobRepository, NewTrustedAccount, ProviderRepository, SchemaRepository, SecretRepository,
    TrustedAccountRepository,
};
use account_sync::secrets::{EncryptedSecretVault, NewSecret, SecretUsage, SecretVault};
use anyhow::Result;
use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::{Map, Value as JsonValue, json};
use uuid::Uuid;

pub const TEST_DOMAIN: &str = "domain-test";
pub const TEST_PROVIDER: &str = "aws";
pub const TEST_PLUGIN_ID: &str = "plugin-aws-collector";
/// Schema of the trusted account's own credential.
pub const TRUSTED_SCHEMA: &str = "aws_access_key";
/// Schema of credentials handed out to discovered service accounts.
pub const ACCOUNT_SCHEMA: &str = "aws_assume_role";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;

    // Fixtures reference rows the tests never create (projects of secrets, etc.)
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = OFF".to_string(),
    ))
    .await?;

    Ok(db)
}

pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    Ok(Arc::new(setup_test_db().await?))
}

pub fn test_crypto_key() -> CryptoKey {
    CryptoKey::new(vec![7u8; 32]).expect("32-byte key")
}

/// Valid configuration for wiring services in tests.
pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        crypto_key: Some(vec![7u8; 32]),
        ..AppConfig::default()
    }
}

pub fn test_services(db: Arc<DatabaseConnection>, transport: Arc<dyn PluginTransport>) -> Services {
    Services::with_transport(test_config(), db, transport).expect("services wire up")
}

/// Registers the test provider and both secret schemas.
pub async fn seed_catalog(db: &Arc<DatabaseConnection>) -> Result<()> {
    ProviderRepository::new(db.clone())
        .create(
            TEST_PROVIDER,
            "Amazon Web Services",
            Some(json!({
                "plugin_id": TEST_PLUGIN_ID,
                "options": { "region": "us-east-1", "page_size": 100 },
                "schema_id": TRUSTED_SCHEMA,
            })),
        )
        .await?;

    let schemas = SchemaRepository::new(db.clone());
    schemas
        .create(
            TRUSTED_SCHEMA,
            "AWS Access Key",
            SecretUsage::Secret.as_str(),
            &["aws_access_key_id", "aws_secret_access_key"],
        )
        .await?;
    schemas
        .create(
            ACCOUNT_SCHEMA,
            "AWS Assume Role",
            SecretUsage::TrustingSecret.as_str(),
            &["key"],
        )
        .await?;
    Ok(())
}

/// Trusted account template; tweak fields before passing to [`create_trusted_account`].
pub fn new_trusted_account(scope: ScopeKind) -> NewTrustedAccount {
    NewTrustedAccount {
        domain_id: TEST_DOMAIN.to_string(),
        workspace_id: None,
        scope,
        name: "org-root".to_string(),
        provider: TEST_PROVIDER.to_string(),
        secret_schema_id: TRUSTED_SCHEMA.to_string(),
        trusted_secret_id: None,
        schedule: Schedule::new(true, [3, 15]),
        sync_options: None,
        plugin_options: Some(json!({ "region": "eu-west-1" })),
    }
}

pub async fn create_trusted_account(
    db: &Arc<DatabaseConnection>,
    new: NewTrustedAccount,
) -> Result<trusted_account::Model> {
    Ok(TrustedAccountRepository::new(db.clone()).create(new).await?)
}

/// Stores a valid trusted credential and returns its id.
pub async fn store_trusted_secret(db: &Arc<DatabaseConnection>) -> Result<Uuid> {
    let vault = EncryptedSecretVault::new(SecretRepository::new(db.clone()), test_crypto_key());
    let data = json!({
        "aws_access_key_id": "AKIATEST",
        "aws_secret_access_key": "shh",
    });
    let id = vault
        .create_secret(
            NewSecret {
                name: "org-root-credential".to_string(),
                resource_group: "DOMAIN".to_string(),
                workspace_id: None,
                project_id: None,
                service_account_id: None,
                trusted_secret_id: None,
                schema_id: Some(TRUSTED_SCHEMA.to_string()),
                data: object(data),
            },
            TEST_DOMAIN,
        )
        .await?;
    Ok(id)
}

pub fn ledger(db: &Arc<DatabaseConnection>) -> JobLedger {
    JobLedger::with_default_window(JobRepository::new(db.clone()))
}

pub fn object(value: JsonValue) -> Map<String, JsonValue> {
    value.as_object().cloned().unwrap_or_default()
}

pub fn node(name: &str, resource_id: &str) -> LocationNode {
    LocationNode {
        name: name.to_string(),
        resource_id: resource_id.to_string(),
    }
}

pub fn record(name: &str, resource_id: &str, location: Vec<LocationNode>) -> DiscoveredRecord {
    DiscoveredRecord {
        name: name.to_string(),
        resource_id: resource_id.to_string(),
        location,
        tags: Map::new(),
        data: object(json!({ "account_id": resource_id })),
        secret_data: None,
        secret_schema_id: None,
    }
}

/// Plugin transport answering every sync call with a scripted response.
#[derive(Default)]
pub struct FakeTransport {
    response: Mutex<Option<Result<SyncResponse, String>>>,
    /// Job canceled through this ledger while the sync call is "running".
    cancel_during_sync: Mutex<Option<(JobLedger, Uuid)>>,
    pub init_calls: Mutex<Vec<Map<String, JsonValue>>>,
    pub sync_calls: Mutex<Vec<SyncRequest>>,
}

impl FakeTransport {
    pub fn returning(records: Vec<DiscoveredRecord>) -> Self {
        let transport = Self::default();
        *transport.response.lock().unwrap() = Some(Ok(SyncResponse { results: records }));
        transport
    }

    pub fn failing(message: &str) -> Self {
        let transport = Self::default();
        *transport.response.lock().unwrap() = Some(Err(message.to_string()));
        transport
    }

    pub fn cancel_during_sync(&self, ledger: JobLedger, job_id: Uuid) {
        *self.cancel_during_sync.lock().unwrap() = Some((ledger, job_id));
    }
}

#[async_trait]
impl PluginTransport for FakeTransport {
    async fn resolve_endpoint(
        &self,
        plugin_info: &PluginInfo,
        _domain_id: &str,
    ) -> Result<PluginEndpoint, SyncError> {
        Ok(PluginEndpoint {
            plugin_id: plugin_info.plugin_id.clone().unwrap_or_default(),
            endpoint: "http://plugin.invalid".to_string(),
            version: plugin_info.version.clone(),
        })
    }

    async fn init(
        &self,
        _endpoint: &PluginEndpoint,
        options: &Map<String, JsonValue>,
    ) -> Result<(), SyncError> {
        self.init_calls.lock().unwrap().push(options.clone());
        Ok(())
    }

    async fn sync(
        &self,
        _endpoint: &PluginEndpoint,
        request: &SyncRequest,
    ) -> Result<SyncResponse, SyncError> {
        self.sync_calls.lock().unwrap().push(request.clone());

        let cancel = self.cancel_during_sync.lock().unwrap().take();
        if let Some((ledger, job_id)) = cancel {
            ledger.mark_canceled(job_id).await?;
        }

        let scripted = self.response.lock().unwrap().clone();
        match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(SyncError::PluginInvocation(message)),
            None => Ok(SyncResponse::default()),
        }
    }
}
