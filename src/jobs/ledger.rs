//! # Job Ledger
//!
//! Owns every mutation of a job's status. Transitions are planned by
//! [`JobStatus::plan`] and written with a compare-and-set on the status the
//! plan was computed from, so a concurrent cancel and an executor finishing
//! the same job cannot both win.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::SyncError;
use crate::jobs::status::{JobStatus, TransitionPlan};
use crate::models::job::Model as Job;
use crate::models::trusted_account;
use crate::repositories::job::{JobFilter, JobRepository, NewJob};

const MAX_TRANSITION_ATTEMPTS: usize = 5;

/// Default grace window before an in-progress duplicate is treated as stale.
pub const DEFAULT_DUPLICATE_WINDOW_MINUTES: i64 = 10;

/// Job counts for one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct JobStats {
    pub total: u64,
    /// Count per status; every status is present, zero when unused.
    pub by_status: BTreeMap<String, u64>,
}

#[derive(Debug, Clone)]
pub struct JobLedger {
    jobs: JobRepository,
    duplicate_window: Duration,
}

impl JobLedger {
    pub fn new(jobs: JobRepository, duplicate_window: Duration) -> Self {
        Self {
            jobs,
            duplicate_window,
        }
    }

    pub fn with_default_window(jobs: JobRepository) -> Self {
        Self::new(jobs, Duration::minutes(DEFAULT_DUPLICATE_WINDOW_MINUTES))
    }

    pub fn duplicate_window(&self) -> Duration {
        self.duplicate_window
    }

    /// Inserts a PENDING job for `account`.
    pub async fn create_job(
        &self,
        account: &trusted_account::Model,
        workspace_scope: &str,
        plugin_id: &str,
        options: JsonValue,
    ) -> Result<Job, SyncError> {
        let job = self
            .jobs
            .insert(NewJob {
                domain_id: account.domain_id.clone(),
                workspace_id: workspace_scope.to_string(),
                trusted_account_id: account.id,
                plugin_id: plugin_id.to_string(),
                resource_group: account.resource_group.clone(),
                options,
            })
            .await?;

        info!(
            job_id = %job.id,
            trusted_account_id = %account.id,
            domain_id = %account.domain_id,
            workspace_id = %job.workspace_id,
            "created sync job"
        );
        Ok(job)
    }

    /// Whether a fresh in-progress job already covers `job`'s account and workspace.
    pub async fn check_duplicate(&self, job: &Job) -> Result<bool, SyncError> {
        Ok(self.duplicate_of(job, Utc::now()).await?.is_some())
    }

    /// Like [`check_duplicate`](Self::check_duplicate), returning the covering job.
    ///
    /// Every in-progress match older than the window is canceled on the way,
    /// whether or not a fresh one is also found.
    pub async fn duplicate_of(
        &self,
        job: &Job,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>, SyncError> {
        let threshold = now - self.duplicate_window;
        let matches = self
            .jobs
            .find_in_progress_for(
                job.trusted_account_id,
                &job.workspace_id,
                &job.domain_id,
                job.id,
            )
            .await?;

        let mut duplicate = None;
        for other in matches {
            if other.created_at.with_timezone(&Utc) > threshold {
                debug!(job_id = %job.id, existing_job_id = %other.id, "fresh duplicate job found");
                duplicate.get_or_insert(other.id);
            } else {
                warn!(
                    job_id = %job.id,
                    stale_job_id = %other.id,
                    created_at = %other.created_at,
                    "canceling stale in-progress job"
                );
                self.mark_canceled(other.id).await?;
            }
        }
        Ok(duplicate)
    }

    pub async fn mark_in_progress(&self, job_id: Uuid) -> Result<Job, SyncError> {
        self.transition(job_id, JobStatus::InProgress, None).await
    }

    pub async fn mark_success(&self, job_id: Uuid) -> Result<Job, SyncError> {
        self.transition(job_id, JobStatus::Success, None).await
    }

    pub async fn mark_failure(&self, job_id: Uuid, error: &SyncError) -> Result<Job, SyncError> {
        self.transition(job_id, JobStatus::Failure, Some(error)).await
    }

    pub async fn mark_canceled(&self, job_id: Uuid) -> Result<Job, SyncError> {
        self.transition(job_id, JobStatus::Canceled, None).await
    }

    /// Moves a job to `to`.
    ///
    /// Terminal jobs are returned unchanged; moves outside the state machine
    /// fail with [`SyncError::InvalidTransition`].
    pub async fn transition(
        &self,
        job_id: Uuid,
        to: JobStatus,
        error: Option<&SyncError>,
    ) -> Result<Job, SyncError> {
        let mut attempts = 0;
        loop {
            let job = self.jobs.get(job_id).await?;
            let from = job.job_status()?;

            match from.plan(to) {
                TransitionPlan::NoOp => {
                    debug!(job_id = %job_id, %from, %to, "job already terminal, ignoring transition");
                    return Ok(job);
                }
                TransitionPlan::Reject => {
                    return Err(SyncError::InvalidTransition { job_id, from, to });
                }
                TransitionPlan::Apply => {
                    let finished_at = to.is_terminal().then(|| Utc::now().fixed_offset());
                    let error_document = error.map(SyncError::to_error_document);
                    if self
                        .jobs
                        .update_status_if(job_id, from.as_str(), to, error_document, finished_at)
                        .await?
                    {
                        debug!(job_id = %job_id, %from, %to, "job status updated");
                        return self.jobs.get(job_id).await;
                    }
                    attempts += 1;
                    if attempts >= MAX_TRANSITION_ATTEMPTS {
                        return Err(SyncError::InvalidTransition { job_id, from, to });
                    }
                    debug!(job_id = %job_id, %from, %to, "job status changed concurrently, retrying");
                }
            }
        }
    }

    pub async fn is_terminally_failed(&self, job_id: Uuid) -> Result<bool, SyncError> {
        let job = self.jobs.get(job_id).await?;
        Ok(job.job_status()?.is_terminally_failed())
    }

    /// Final bookkeeping after execution: IN_PROGRESS becomes SUCCESS and a
    /// terminal job missing `finished_at` gets one.
    pub async fn close_if_open(&self, job_id: Uuid) -> Result<Job, SyncError> {
        let job = self.jobs.get(job_id).await?;
        let status = job.job_status()?;

        if status == JobStatus::InProgress {
            return self.mark_success(job_id).await;
        }
        if status.is_terminal() && job.finished_at.is_none() {
            self.jobs.stamp_finished(job_id).await?;
            return self.jobs.get(job_id).await;
        }
        Ok(job)
    }

    pub async fn get_job(
        &self,
        domain_id: &str,
        job_id: Uuid,
        workspace_id: Option<&str>,
    ) -> Result<Job, SyncError> {
        self.jobs
            .find_scoped(domain_id, job_id, workspace_id)
            .await?
            .ok_or_else(|| SyncError::not_found("job", job_id))
    }

    pub async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, SyncError> {
        self.jobs.list(filter).await
    }

    pub async fn stat_jobs(&self, domain_id: &str) -> Result<JobStats, SyncError> {
        let mut by_status: BTreeMap<String, u64> = JobStatus::ALL
            .iter()
            .map(|status| (status.as_str().to_string(), 0))
            .collect();
        for (status, count) in self.jobs.count_by_status(domain_id).await? {
            *by_status.entry(status).or_default() += count;
        }
        Ok(JobStats {
            total: by_status.values().sum(),
            by_status,
        })
    }

    pub async fn delete_job(&self, domain_id: &str, job_id: Uuid) -> Result<(), SyncError> {
        if self.jobs.delete(domain_id, job_id).await? {
            info!(job_id = %job_id, domain_id = %domain_id, "deleted job");
            Ok(())
        } else {
            Err(SyncError::not_found("job", job_id))
        }
    }

    /// Operator cancel; the executor notices it at its next checkpoint.
    pub async fn cancel(&self, domain_id: &str, job_id: Uuid) -> Result<Job, SyncError> {
        let job = self.get_job(domain_id, job_id, None).await?;
        let canceled = self.mark_canceled(job.id).await?;
        info!(job_id = %job_id, status = %canceled.status, "cancel requested");
        Ok(canceled)
    }
}
