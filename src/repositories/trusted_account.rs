//! Trusted account repository

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::SyncError;
use crate::models::trusted_account::{self, Entity as TrustedAccount, Schedule, ScopeKind};

/// Fields required to register a trusted account.
#[derive(Debug, Clone)]
pub struct NewTrustedAccount {
    pub domain_id: String,
    pub workspace_id: Option<Uuid>,
    pub scope: ScopeKind,
    pub name: String,
    pub provider: String,
    pub secret_schema_id: String,
    pub trusted_secret_id: Option<Uuid>,
    pub schedule: Schedule,
    pub sync_options: Option<JsonValue>,
    pub plugin_options: Option<JsonValue>,
}

#[derive(Debug, Clone)]
pub struct TrustedAccountRepository {
    pub db: Arc<DatabaseConnection>,
}

impl TrustedAccountRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find(
        &self,
        domain_id: &str,
        trusted_account_id: Uuid,
    ) -> Result<Option<trusted_account::Model>, SyncError> {
        Ok(TrustedAccount::find_by_id(trusted_account_id)
            .filter(trusted_account::Column::DomainId.eq(domain_id))
            .one(&*self.db)
            .await?)
    }

    pub async fn get(
        &self,
        domain_id: &str,
        trusted_account_id: Uuid,
    ) -> Result<trusted_account::Model, SyncError> {
        self.find(domain_id, trusted_account_id)
            .await?
            .ok_or_else(|| SyncError::not_found("trusted account", trusted_account_id))
    }

    /// Accounts with an enabled schedule, in a stable order.
    ///
    /// Hour membership is checked by the caller since `schedule_hours` is a
    /// JSON column with no portable containment operator.
    pub async fn list_schedule_enabled(&self) -> Result<Vec<trusted_account::Model>, SyncError> {
        Ok(TrustedAccount::find()
            .filter(trusted_account::Column::ScheduleEnabled.eq(true))
            .order_by_asc(trusted_account::Column::CreatedAt)
            .order_by_asc(trusted_account::Column::Id)
            .all(&*self.db)
            .await?)
    }

    pub async fn create(
        &self,
        new: NewTrustedAccount,
    ) -> Result<trusted_account::Model, SyncError> {
        let now = Utc::now().fixed_offset();
        let model = trusted_account::ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(new.domain_id),
            workspace_id: Set(new.workspace_id),
            resource_group: Set(new.scope.as_str().to_string()),
            name: Set(new.name),
            provider: Set(new.provider),
            secret_schema_id: Set(new.secret_schema_id),
            trusted_secret_id: Set(new.trusted_secret_id),
            schedule_enabled: Set(new.schedule.enabled),
            schedule_hours: Set(new.schedule.hours_json()),
            sync_options: Set(new.sync_options),
            plugin_options: Set(new.plugin_options),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(&*self.db).await?)
    }

    /// Operator schedule edit.
    pub async fn update_schedule(
        &self,
        domain_id: &str,
        trusted_account_id: Uuid,
        schedule: &Schedule,
    ) -> Result<trusted_account::Model, SyncError> {
        let existing = self.get(domain_id, trusted_account_id).await?;
        let mut active: trusted_account::ActiveModel = existing.into();
        active.schedule_enabled = Set(schedule.enabled);
        active.schedule_hours = Set(schedule.hours_json());
        active.updated_at = Set(Utc::now().fixed_offset());
        Ok(active.update(&*self.db).await?)
    }
}
