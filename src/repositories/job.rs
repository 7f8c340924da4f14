//! # Job Repository
//!
//! Row-level operations for the jobs table. Status changes go through
//! [`JobRepository::update_status_if`], a compare-and-set on the current status,
//! so concurrent writers cannot overwrite each other's transitions; the state
//! machine itself lives in `crate::jobs`.

use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::prelude::{DateTimeWithTimeZone, Expr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::SyncError;
use crate::jobs::JobStatus;
use crate::models::job::{self, ActiveModel, Column, Entity, Model};

/// Fields of a job at creation time.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub domain_id: String,
    pub workspace_id: String,
    pub trusted_account_id: Uuid,
    pub plugin_id: String,
    pub resource_group: String,
    pub options: JsonValue,
}

/// Optional filters for listing jobs; every set field must match.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub domain_id: String,
    pub job_id: Option<Uuid>,
    pub status: Option<JobStatus>,
    pub trusted_account_id: Option<Uuid>,
    pub plugin_id: Option<String>,
    pub workspace_id: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Repository for job database operations
#[derive(Debug, Clone)]
pub struct JobRepository {
    pub db: Arc<DatabaseConnection>,
}

impl JobRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Inserts a PENDING job.
    pub async fn insert(&self, new: NewJob) -> Result<Model, SyncError> {
        let now = Utc::now().fixed_offset();
        let job = ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(new.domain_id),
            workspace_id: Set(new.workspace_id),
            trusted_account_id: Set(new.trusted_account_id),
            plugin_id: Set(new.plugin_id),
            resource_group: Set(new.resource_group),
            status: Set(JobStatus::Pending.as_str().to_string()),
            options: Set(new.options),
            error: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            finished_at: Set(None),
        };

        let result = job.insert(&*self.db).await.map_err(|e| {
            tracing::error!(error = %e, "failed to insert job");
            e
        })?;
        Ok(result)
    }

    pub async fn find(&self, job_id: Uuid) -> Result<Option<Model>, SyncError> {
        Ok(Entity::find_by_id(job_id).one(&*self.db).await?)
    }

    pub async fn get(&self, job_id: Uuid) -> Result<Model, SyncError> {
        self.find(job_id)
            .await?
            .ok_or_else(|| SyncError::not_found("job", job_id))
    }

    /// Finds a job visible from the given domain (and workspace, when given).
    pub async fn find_scoped(
        &self,
        domain_id: &str,
        job_id: Uuid,
        workspace_id: Option<&str>,
    ) -> Result<Option<Model>, SyncError> {
        let mut query = Entity::find_by_id(job_id).filter(Column::DomainId.eq(domain_id));
        if let Some(workspace_id) = workspace_id {
            query = query.filter(Column::WorkspaceId.eq(workspace_id));
        }
        Ok(query.one(&*self.db).await?)
    }

    /// In-progress jobs for the same account/workspace/domain, excluding `exclude_id`.
    pub async fn find_in_progress_for(
        &self,
        trusted_account_id: Uuid,
        workspace_id: &str,
        domain_id: &str,
        exclude_id: Uuid,
    ) -> Result<Vec<Model>, SyncError> {
        Ok(Entity::find()
            .filter(Column::TrustedAccountId.eq(trusted_account_id))
            .filter(Column::WorkspaceId.eq(workspace_id))
            .filter(Column::DomainId.eq(domain_id))
            .filter(Column::Status.eq(JobStatus::InProgress.as_str()))
            .filter(Column::Id.ne(exclude_id))
            .order_by_asc(Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn list(&self, filter: &JobFilter) -> Result<Vec<Model>, SyncError> {
        let mut query = Entity::find()
            .filter(Column::DomainId.eq(filter.domain_id.as_str()))
            .order_by_desc(Column::CreatedAt);

        if let Some(job_id) = filter.job_id {
            query = query.filter(Column::Id.eq(job_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(Column::Status.eq(status.as_str()));
        }
        if let Some(trusted_account_id) = filter.trusted_account_id {
            query = query.filter(Column::TrustedAccountId.eq(trusted_account_id));
        }
        if let Some(plugin_id) = &filter.plugin_id {
            query = query.filter(Column::PluginId.eq(plugin_id.as_str()));
        }
        if let Some(workspace_id) = &filter.workspace_id {
            query = query.filter(Column::WorkspaceId.eq(workspace_id.as_str()));
        }

        let results = match filter.limit {
            Some(limit) => {
                query
                    .offset(filter.offset.unwrap_or(0))
                    .limit(limit)
                    .all(&*self.db)
                    .await
            }
            None => query.all(&*self.db).await,
        }?;

        Ok(results)
    }

    /// Number of jobs per status string within a domain.
    pub async fn count_by_status(&self, domain_id: &str) -> Result<BTreeMap<String, u64>, SyncError> {
        let rows: Vec<(String, i64)> = Entity::find()
            .select_only()
            .column(Column::Status)
            .column_as(Column::Id.count(), "count")
            .filter(Column::DomainId.eq(domain_id))
            .group_by(Column::Status)
            .into_tuple()
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(status, count)| (status, count.max(0) as u64))
            .collect())
    }

    /// Moves a job from `expected` to `status` only if it is still in `expected`.
    ///
    /// Returns `false` when another writer changed the status first.
    pub async fn update_status_if(
        &self,
        job_id: Uuid,
        expected: &str,
        status: JobStatus,
        error: Option<JsonValue>,
        finished_at: Option<DateTimeWithTimeZone>,
    ) -> Result<bool, SyncError> {
        let now = Utc::now().fixed_offset();
        let mut update = Entity::update_many()
            .col_expr(Column::Status, Expr::value(status.as_str()))
            .col_expr(Column::UpdatedAt, Expr::value(now));
        if let Some(error) = error {
            update = update.col_expr(Column::Error, Expr::value(error));
        }
        if let Some(finished_at) = finished_at {
            update = update.col_expr(Column::FinishedAt, Expr::value(finished_at));
        }

        let result = update
            .filter(Column::Id.eq(job_id))
            .filter(Column::Status.eq(expected))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Stamps `finished_at` on a terminal job that is missing it.
    pub async fn stamp_finished(&self, job_id: Uuid) -> Result<bool, SyncError> {
        let now = Utc::now().fixed_offset();
        let result = Entity::update_many()
            .col_expr(Column::FinishedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(job_id))
            .filter(Column::FinishedAt.is_null())
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    pub async fn delete(&self, domain_id: &str, job_id: Uuid) -> Result<bool, SyncError> {
        let result = Entity::delete_many()
            .filter(Column::Id.eq(job_id))
            .filter(Column::DomainId.eq(domain_id))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Overwrites `created_at`; used by maintenance tooling and tests that age jobs.
    pub async fn set_created_at(
        &self,
        job_id: Uuid,
        created_at: DateTimeWithTimeZone,
    ) -> Result<Model, SyncError> {
        let job = self.get(job_id).await?;
        let mut active: job::ActiveModel = job.into();
        active.created_at = Set(created_at);
        Ok(active.update(&*self.db).await?)
    }
}
