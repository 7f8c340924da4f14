//! Project repository

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::SyncError;
use crate::models::project::{self, Column, Entity as Project, PROJECT_TYPE_PRIVATE};

#[derive(Debug, Clone)]
pub struct ProjectRepository {
    pub db: Arc<DatabaseConnection>,
}

impl ProjectRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Private project with the given provider id inside a workspace.
    pub async fn find_by_reference(
        &self,
        domain_id: &str,
        workspace_id: Uuid,
        reference_id: &str,
    ) -> Result<Option<project::Model>, SyncError> {
        Ok(Project::find()
            .filter(Column::ReferenceId.eq(reference_id))
            .filter(Column::DomainId.eq(domain_id))
            .filter(Column::WorkspaceId.eq(workspace_id))
            .filter(Column::ProjectType.eq(PROJECT_TYPE_PRIVATE))
            .one(&*self.db)
            .await?)
    }

    pub async fn list_by_domain(&self, domain_id: &str) -> Result<Vec<project::Model>, SyncError> {
        Ok(Project::find()
            .filter(Column::DomainId.eq(domain_id))
            .all(&*self.db)
            .await?)
    }

    pub async fn insert(&self, model: project::ActiveModel) -> Result<project::Model, SyncError> {
        Ok(model.insert(&*self.db).await?)
    }

    pub async fn update(&self, model: project::ActiveModel) -> Result<project::Model, SyncError> {
        Ok(model.update(&*self.db).await?)
    }
}
