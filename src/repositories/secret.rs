//! Secret repository
//!
//! Stores already-sealed payloads; encryption is the vault's concern.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::SyncError;
use crate::models::secret::{self, Entity as Secret};

#[derive(Debug, Clone)]
pub struct SecretRepository {
    pub db: Arc<DatabaseConnection>,
}

impl SecretRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, model: secret::ActiveModel) -> Result<secret::Model, SyncError> {
        Ok(model.insert(&*self.db).await?)
    }

    /// Finds a secret within a domain
    pub async fn find(
        &self,
        domain_id: &str,
        secret_id: Uuid,
    ) -> Result<Option<secret::Model>, SyncError> {
        Ok(Secret::find_by_id(secret_id)
            .filter(secret::Column::DomainId.eq(domain_id))
            .one(&*self.db)
            .await?)
    }

    pub async fn list_for_service_account(
        &self,
        domain_id: &str,
        service_account_id: Uuid,
    ) -> Result<Vec<secret::Model>, SyncError> {
        Ok(Secret::find()
            .filter(secret::Column::DomainId.eq(domain_id))
            .filter(secret::Column::ServiceAccountId.eq(service_account_id))
            .all(&*self.db)
            .await?)
    }

    /// Deletes a secret; returns whether a row was removed.
    pub async fn delete(&self, domain_id: &str, secret_id: Uuid) -> Result<bool, SyncError> {
        let result = Secret::delete_many()
            .filter(secret::Column::Id.eq(secret_id))
            .filter(secret::Column::DomainId.eq(domain_id))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
