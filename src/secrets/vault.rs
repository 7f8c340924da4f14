//! Secret vault backed by the `secrets` table
//!
//! Payloads are sealed with AES-256-GCM; the AAD is `domain_id|secret_id`, so
//! a ciphertext only opens under the row it was written for.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::Set;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::crypto::{self, CryptoKey};
use crate::error::SyncError;
use crate::models::secret;
use crate::repositories::SecretRepository;
use crate::secrets::{NewSecret, SecretPayload, SecretVault};

#[derive(Clone)]
pub struct EncryptedSecretVault {
    secrets: SecretRepository,
    crypto_key: CryptoKey,
}

impl EncryptedSecretVault {
    pub fn new(secrets: SecretRepository, crypto_key: CryptoKey) -> Self {
        Self {
            secrets,
            crypto_key,
        }
    }
}

#[async_trait]
impl SecretVault for EncryptedSecretVault {
    async fn get_secret_data(
        &self,
        secret_id: Uuid,
        domain_id: &str,
    ) -> Result<SecretPayload, SyncError> {
        let secret = self
            .secrets
            .find(domain_id, secret_id)
            .await?
            .ok_or_else(|| SyncError::not_found("secret", secret_id))?;

        let aad = crypto::secret_aad(domain_id, secret_id);
        Ok(crypto::open_json(&self.crypto_key, &aad, &secret.ciphertext)?)
    }

    async fn create_secret(&self, params: NewSecret, domain_id: &str) -> Result<Uuid, SyncError> {
        let id = Uuid::new_v4();
        let aad = crypto::secret_aad(domain_id, id);
        let ciphertext = crypto::seal_json(&self.crypto_key, &aad, &params.data)?;

        let model = secret::ActiveModel {
            id: Set(id),
            domain_id: Set(domain_id.to_string()),
            name: Set(params.name),
            resource_group: Set(params.resource_group),
            workspace_id: Set(params.workspace_id),
            project_id: Set(params.project_id),
            service_account_id: Set(params.service_account_id),
            trusted_secret_id: Set(params.trusted_secret_id),
            schema_id: Set(params.schema_id),
            ciphertext: Set(ciphertext),
            created_at: Set(Utc::now().fixed_offset()),
        };
        self.secrets.insert(model).await?;
        debug!(secret_id = %id, domain_id = %domain_id, "stored secret");
        Ok(id)
    }

    async fn delete_secret(&self, secret_id: Uuid, domain_id: &str) -> Result<(), SyncError> {
        if !self.secrets.delete(domain_id, secret_id).await? {
            // already gone; the caller's goal is met
            warn!(secret_id = %secret_id, domain_id = %domain_id, "secret to delete was not found");
        }
        Ok(())
    }
}
