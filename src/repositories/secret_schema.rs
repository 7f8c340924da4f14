//! Secret schema repository

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;

use crate::error::SyncError;
use crate::models::secret_schema::{self, Entity as SecretSchema};

#[derive(Debug, Clone)]
pub struct SchemaRepository {
    pub db: Arc<DatabaseConnection>,
}

impl SchemaRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find(&self, schema_id: &str) -> Result<Option<secret_schema::Model>, SyncError> {
        Ok(SecretSchema::find_by_id(schema_id.to_string())
            .one(&*self.db)
            .await?)
    }

    pub async fn create(
        &self,
        schema_id: &str,
        name: &str,
        usage: &str,
        required_fields: &[&str],
    ) -> Result<secret_schema::Model, SyncError> {
        let model = secret_schema::ActiveModel {
            schema_id: Set(schema_id.to_string()),
            name: Set(name.to_string()),
            usage: Set(usage.to_string()),
            required_fields: Set(serde_json::json!(required_fields)),
            created_at: Set(Utc::now().fixed_offset()),
        };
        Ok(model.insert(&*self.db).await?)
    }
}
