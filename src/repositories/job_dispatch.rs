//! Job dispatch repository
//!
//! Queue storage for execution messages. Claiming follows a
//! select-then-guarded-update pattern so two workers never both win the same
//! row, and a claim that outlives the visibility timeout becomes claimable
//! again (at-least-once delivery).

use chrono::{Duration, Utc};
use sea_orm::prelude::{DateTimeWithTimeZone, Expr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::SyncError;
use crate::models::job_dispatch::{
    self, Column, Entity as JobDispatch, STATUS_CLAIMED, STATUS_DONE, STATUS_QUEUED,
};

#[derive(Debug, Clone)]
pub struct JobDispatchRepository {
    pub db: Arc<DatabaseConnection>,
}

impl JobDispatchRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Inserts a queued message whose payload is already sealed for `id`.
    pub async fn insert(
        &self,
        id: Uuid,
        job_id: Uuid,
        payload: Vec<u8>,
    ) -> Result<job_dispatch::Model, SyncError> {
        let now = Utc::now().fixed_offset();
        let model = job_dispatch::ActiveModel {
            id: Set(id),
            job_id: Set(job_id),
            status: Set(STATUS_QUEUED.to_string()),
            attempts: Set(0),
            payload: Set(payload),
            available_at: Set(now),
            claimed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(&*self.db).await?)
    }

    fn claimable(now: DateTimeWithTimeZone, visibility_timeout: Duration) -> Condition {
        let stale_before = now - visibility_timeout;
        Condition::any()
            .add(
                Condition::all()
                    .add(Column::Status.eq(STATUS_QUEUED))
                    .add(Column::AvailableAt.lte(now)),
            )
            .add(
                Condition::all()
                    .add(Column::Status.eq(STATUS_CLAIMED))
                    .add(Column::ClaimedAt.lte(stale_before)),
            )
    }

    /// Atomically claims up to `batch` messages.
    pub async fn claim(
        &self,
        batch: u64,
        visibility_timeout: Duration,
    ) -> Result<Vec<job_dispatch::Model>, SyncError> {
        let now = Utc::now().fixed_offset();
        let txn = self.db.begin().await?;

        let eligible: Vec<Uuid> = JobDispatch::find()
            .select_only()
            .column(Column::Id)
            .filter(Self::claimable(now, visibility_timeout))
            .order_by_asc(Column::AvailableAt)
            .order_by_asc(Column::CreatedAt)
            .limit(batch)
            .into_tuple()
            .all(&txn)
            .await?;

        if eligible.is_empty() {
            txn.commit().await?;
            return Ok(Vec::new());
        }

        // Re-check eligibility in the UPDATE so a concurrent claimer loses cleanly
        let updated = JobDispatch::update_many()
            .col_expr(Column::Status, Expr::value(STATUS_CLAIMED))
            .col_expr(Column::ClaimedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .col_expr(
                Column::Attempts,
                Expr::value(Expr::col(Column::Attempts).add(1)),
            )
            .filter(Column::Id.is_in(eligible.clone()))
            .filter(Self::claimable(now, visibility_timeout))
            .exec(&txn)
            .await?;

        let claimed = if updated.rows_affected > 0 {
            JobDispatch::find()
                .filter(Column::Id.is_in(eligible))
                .filter(Column::Status.eq(STATUS_CLAIMED))
                .filter(Column::ClaimedAt.eq(now))
                .all(&txn)
                .await?
        } else {
            Vec::new()
        };

        txn.commit().await?;
        Ok(claimed)
    }

    /// Marks a message as processed.
    pub async fn complete(&self, id: Uuid) -> Result<bool, SyncError> {
        let now = Utc::now().fixed_offset();
        let result = JobDispatch::update_many()
            .col_expr(Column::Status, Expr::value(STATUS_DONE))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.ne(STATUS_DONE))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// Queued or claimed message of a job, if any.
    pub async fn find_open_for_job(
        &self,
        job_id: Uuid,
    ) -> Result<Option<job_dispatch::Model>, SyncError> {
        Ok(JobDispatch::find()
            .filter(Column::JobId.eq(job_id))
            .filter(Column::Status.is_in([STATUS_QUEUED, STATUS_CLAIMED]))
            .one(&*self.db)
            .await?)
    }

    pub async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<job_dispatch::Model>, SyncError> {
        Ok(JobDispatch::find()
            .filter(Column::JobId.eq(job_id))
            .order_by_asc(Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Test/maintenance hook: pretend a claim happened at `claimed_at`.
    pub async fn set_claimed_at(
        &self,
        id: Uuid,
        claimed_at: DateTimeWithTimeZone,
    ) -> Result<(), SyncError> {
        JobDispatch::update_many()
            .col_expr(Column::ClaimedAt, Expr::value(claimed_at))
            .filter(Column::Id.eq(id))
            .exec(&*self.db)
            .await?;
        Ok(())
    }
}
