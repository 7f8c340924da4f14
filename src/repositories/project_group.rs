//! Project group repository

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::SyncError;
use crate::models::project_group::{self, Column, Entity as ProjectGroup};

#[derive(Debug, Clone)]
pub struct ProjectGroupRepository {
    pub db: Arc<DatabaseConnection>,
}

impl ProjectGroupRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Managed group with the given provider id inside a workspace.
    pub async fn find_managed_by_reference(
        &self,
        domain_id: &str,
        workspace_id: Uuid,
        reference_id: &str,
    ) -> Result<Option<project_group::Model>, SyncError> {
        Ok(ProjectGroup::find()
            .filter(Column::IsManaged.eq(true))
            .filter(Column::ReferenceId.eq(reference_id))
            .filter(Column::DomainId.eq(domain_id))
            .filter(Column::WorkspaceId.eq(workspace_id))
            .one(&*self.db)
            .await?)
    }

    pub async fn list_by_workspace(
        &self,
        domain_id: &str,
        workspace_id: Uuid,
    ) -> Result<Vec<project_group::Model>, SyncError> {
        Ok(ProjectGroup::find()
            .filter(Column::DomainId.eq(domain_id))
            .filter(Column::WorkspaceId.eq(workspace_id))
            .all(&*self.db)
            .await?)
    }

    pub async fn insert(
        &self,
        model: project_group::ActiveModel,
    ) -> Result<project_group::Model, SyncError> {
        Ok(model.insert(&*self.db).await?)
    }

    pub async fn update(
        &self,
        model: project_group::ActiveModel,
    ) -> Result<project_group::Model, SyncError> {
        Ok(model.update(&*self.db).await?)
    }
}
