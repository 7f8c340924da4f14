//! Secret rotator
//!
//! Replaces the credential attached to a service account: the new payload is
//! validated, the previous secret removed, a new one stored and its id written
//! back onto the account.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::SyncError;
use crate::models::service_account;
use crate::repositories::ServiceAccountRepository;
use crate::secrets::{
    NewSecret, SECRET_RESOURCE_GROUP_PROJECT, SchemaValidator, SecretPayload, SecretUsage,
    SecretVault,
};

#[derive(Clone)]
pub struct SecretRotator {
    vault: Arc<dyn SecretVault>,
    validator: Arc<dyn SchemaValidator>,
    service_accounts: ServiceAccountRepository,
}

impl SecretRotator {
    pub fn new(
        vault: Arc<dyn SecretVault>,
        validator: Arc<dyn SchemaValidator>,
        service_accounts: ServiceAccountRepository,
    ) -> Self {
        Self {
            vault,
            validator,
            service_accounts,
        }
    }

    pub async fn rotate(
        &self,
        account: service_account::Model,
        payload: &SecretPayload,
        schema_id: Option<&str>,
        trusted_secret_id: Option<Uuid>,
    ) -> Result<service_account::Model, SyncError> {
        let domain_id = account.domain_id.clone();
        let schema_id = schema_id.ok_or_else(|| {
            SyncError::SecretValidation(format!(
                "secret data for service account {} carries no schema id",
                account.id
            ))
        })?;

        self.validator
            .validate_secret_data(schema_id, &domain_id, payload, SecretUsage::TrustingSecret)
            .await?;

        if let Some(old_secret_id) = account.secret_id {
            debug!(service_account_id = %account.id, secret_id = %old_secret_id, "deleting previous secret");
            self.vault.delete_secret(old_secret_id, &domain_id).await?;
        }

        let secret_id = self
            .vault
            .create_secret(
                NewSecret {
                    name: format!("{}-secret", account.id),
                    resource_group: SECRET_RESOURCE_GROUP_PROJECT.to_string(),
                    workspace_id: Some(account.workspace_id),
                    project_id: Some(account.project_id),
                    service_account_id: Some(account.id),
                    trusted_secret_id,
                    schema_id: Some(schema_id.to_string()),
                    data: payload.clone(),
                },
                &domain_id,
            )
            .await?;

        let service_account_id = account.id;
        let updated = self
            .service_accounts
            .set_secret(account, secret_id, Some(schema_id.to_string()))
            .await?;
        info!(
            service_account_id = %service_account_id,
            secret_id = %secret_id,
            domain_id = %domain_id,
            "rotated service account secret"
        );
        Ok(updated)
    }
}
