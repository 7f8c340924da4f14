//! # Secrets
//!
//! Collaborator seams for credential storage ([`SecretVault`]) and payload
//! validation ([`SchemaValidator`]), their SeaORM-backed implementations, and
//! the [`SecretRotator`] that replaces the credential behind a service account.

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::error::SyncError;
use crate::models::secret_schema;

pub mod rotator;
pub mod validator;
pub mod vault;

pub use rotator::SecretRotator;
pub use validator::RepositorySchemaValidator;
pub use vault::EncryptedSecretVault;

/// Decrypted credential payload.
pub type SecretPayload = Map<String, JsonValue>;

/// What a schema is meant to validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretUsage {
    /// Credentials of a trusted account
    Secret,
    /// Credentials derived from a trusted account for a discovered service account
    TrustingSecret,
}

impl SecretUsage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretUsage::Secret => "SECRET",
            SecretUsage::TrustingSecret => "TRUSTING_SECRET",
        }
    }
}

impl fmt::Display for SecretUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource group assigned to secrets created for service accounts.
pub const SECRET_RESOURCE_GROUP_PROJECT: &str = "PROJECT";

/// Parameters of a secret to create.
#[derive(Debug, Clone)]
pub struct NewSecret {
    pub name: String,
    pub resource_group: String,
    pub workspace_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub service_account_id: Option<Uuid>,
    pub trusted_secret_id: Option<Uuid>,
    pub schema_id: Option<String>,
    pub data: SecretPayload,
}

#[async_trait]
pub trait SecretVault: Send + Sync {
    async fn get_secret_data(
        &self,
        secret_id: Uuid,
        domain_id: &str,
    ) -> Result<SecretPayload, SyncError>;

    /// Stores a secret and returns its id.
    async fn create_secret(&self, params: NewSecret, domain_id: &str) -> Result<Uuid, SyncError>;

    async fn delete_secret(&self, secret_id: Uuid, domain_id: &str) -> Result<(), SyncError>;
}

#[async_trait]
pub trait SchemaValidator: Send + Sync {
    async fn get_schema(
        &self,
        schema_id: &str,
        domain_id: &str,
    ) -> Result<secret_schema::Model, SyncError>;

    async fn validate_secret_data(
        &self,
        schema_id: &str,
        domain_id: &str,
        data: &SecretPayload,
        usage: SecretUsage,
    ) -> Result<(), SyncError>;
}
