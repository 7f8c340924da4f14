//! Workspace repository

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::SyncError;
use crate::models::workspace::{self, Column, Entity as Workspace};

#[derive(Debug, Clone)]
pub struct WorkspaceRepository {
    pub db: Arc<DatabaseConnection>,
}

impl WorkspaceRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find(
        &self,
        domain_id: &str,
        workspace_id: Uuid,
    ) -> Result<Option<workspace::Model>, SyncError> {
        Ok(Workspace::find_by_id(workspace_id)
            .filter(Column::DomainId.eq(domain_id))
            .one(&*self.db)
            .await?)
    }

    /// Oldest workspace of the domain carrying `name`.
    pub async fn find_by_name(
        &self,
        domain_id: &str,
        name: &str,
    ) -> Result<Option<workspace::Model>, SyncError> {
        Ok(Workspace::find()
            .filter(Column::DomainId.eq(domain_id))
            .filter(Column::Name.eq(name))
            .order_by_asc(Column::CreatedAt)
            .one(&*self.db)
            .await?)
    }

    pub async fn list_by_domain(&self, domain_id: &str) -> Result<Vec<workspace::Model>, SyncError> {
        Ok(Workspace::find()
            .filter(Column::DomainId.eq(domain_id))
            .order_by_asc(Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Workspaces of the domain whose `references` contain `reference_id`.
    ///
    /// Filtered in Rust: JSON array containment differs between Postgres
    /// (`jsonb @>`) and SQLite, and a domain holds few workspaces.
    pub async fn list_holding_reference(
        &self,
        domain_id: &str,
        reference_id: &str,
    ) -> Result<Vec<workspace::Model>, SyncError> {
        Ok(self
            .list_by_domain(domain_id)
            .await?
            .into_iter()
            .filter(|ws| ws.has_reference(reference_id))
            .collect())
    }

    pub async fn insert(&self, model: workspace::ActiveModel) -> Result<workspace::Model, SyncError> {
        Ok(model.insert(&*self.db).await?)
    }

    pub async fn update(&self, model: workspace::ActiveModel) -> Result<workspace::Model, SyncError> {
        Ok(model.update(&*self.db).await?)
    }
}
