//! Service account repository

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::SyncError;
use crate::models::service_account::{self, Column, Entity as ServiceAccount};

/// Identity of a managed service account.
#[derive(Debug, Clone, Copy)]
pub struct ServiceAccountKey<'a> {
    pub provider: &'a str,
    pub reference_id: &'a str,
    pub domain_id: &'a str,
    pub workspace_id: Uuid,
    pub project_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct ServiceAccountRepository {
    pub db: Arc<DatabaseConnection>,
}

impl ServiceAccountRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find(
        &self,
        domain_id: &str,
        service_account_id: Uuid,
    ) -> Result<Option<service_account::Model>, SyncError> {
        Ok(ServiceAccount::find_by_id(service_account_id)
            .filter(Column::DomainId.eq(domain_id))
            .one(&*self.db)
            .await?)
    }

    pub async fn find_managed(
        &self,
        key: ServiceAccountKey<'_>,
    ) -> Result<Option<service_account::Model>, SyncError> {
        Ok(ServiceAccount::find()
            .filter(Column::Provider.eq(key.provider))
            .filter(Column::ReferenceId.eq(key.reference_id))
            .filter(Column::IsManaged.eq(true))
            .filter(Column::DomainId.eq(key.domain_id))
            .filter(Column::WorkspaceId.eq(key.workspace_id))
            .filter(Column::ProjectId.eq(key.project_id))
            .one(&*self.db)
            .await?)
    }

    pub async fn list_by_domain(
        &self,
        domain_id: &str,
    ) -> Result<Vec<service_account::Model>, SyncError> {
        Ok(ServiceAccount::find()
            .filter(Column::DomainId.eq(domain_id))
            .all(&*self.db)
            .await?)
    }

    pub async fn insert(
        &self,
        model: service_account::ActiveModel,
    ) -> Result<service_account::Model, SyncError> {
        Ok(model.insert(&*self.db).await?)
    }

    pub async fn update(
        &self,
        model: service_account::ActiveModel,
    ) -> Result<service_account::Model, SyncError> {
        Ok(model.update(&*self.db).await?)
    }

    /// Points the account at its new secret.
    pub async fn set_secret(
        &self,
        account: service_account::Model,
        secret_id: Uuid,
        schema_id: Option<String>,
    ) -> Result<service_account::Model, SyncError> {
        let mut active: service_account::ActiveModel = account.into();
        active.secret_id = Set(Some(secret_id));
        if schema_id.is_some() {
            active.schema_id = Set(schema_id);
        }
        active.updated_at = Set(Utc::now().fixed_offset());
        Ok(active.update(&*self.db).await?)
    }
}
