//! Provider repository for database operations

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::error::SyncError;
use crate::models::provider::{self, Entity as Provider};

/// Repository for provider database operations
#[derive(Debug, Clone)]
pub struct ProviderRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl ProviderRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a provider by its identifier
    pub async fn find(&self, provider: &str) -> Result<Option<provider::Model>, SyncError> {
        Ok(Provider::find_by_id(provider.to_string())
            .one(&*self.db)
            .await?)
    }

    /// Like [`find`](Self::find) but treats absence as an error.
    pub async fn get(&self, provider: &str) -> Result<provider::Model, SyncError> {
        self.find(provider)
            .await?
            .ok_or_else(|| SyncError::not_found("provider", provider))
    }

    pub async fn list_all(&self) -> Result<Vec<provider::Model>, SyncError> {
        Ok(Provider::find()
            .order_by_asc(provider::Column::Provider)
            .all(&*self.db)
            .await?)
    }

    /// Registers a provider and its plugin binding.
    pub async fn create(
        &self,
        provider: &str,
        name: &str,
        plugin_info: Option<JsonValue>,
    ) -> Result<provider::Model, SyncError> {
        let now = Utc::now().fixed_offset();
        let model = provider::ActiveModel {
            provider: Set(provider.to_string()),
            name: Set(name.to_string()),
            plugin_info: Set(plugin_info),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(&*self.db).await?)
    }
}
