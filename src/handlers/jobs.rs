//! # Jobs API Handlers
//!
//! Listing, statistics, lookup, cancel and delete for sync jobs. Every
//! endpoint is scoped to the domain named by `X-Domain-Id`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, validation_error};
use crate::handlers::DomainId;
use crate::jobs::{JobStats, JobStatus};
use crate::models::job;
use crate::repositories::JobFilter;
use crate::server::AppState;

const DEFAULT_LIMIT: u64 = 50;
const MAX_LIMIT: u64 = 200;

/// Query parameters for listing jobs
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListJobsQuery {
    pub job_id: Option<Uuid>,
    /// One of PENDING, IN_PROGRESS, SUCCESS, FAILURE, CANCELED
    pub status: Option<JobStatus>,
    pub trusted_account_id: Option<Uuid>,
    pub plugin_id: Option<String>,
    /// Workspace uuid or `*`
    pub workspace_id: Option<String>,
    /// Maximum number of jobs to return (default: 50, max: 200)
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Job information response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobInfo {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub job_id: String,
    #[schema(example = "domain-123")]
    pub domain_id: String,
    /// Workspace uuid, or `*` for domain-wide jobs
    #[schema(example = "*")]
    pub workspace_id: String,
    pub trusted_account_id: String,
    #[schema(example = "plugin-aws-account-collector")]
    pub plugin_id: String,
    #[schema(example = "DOMAIN")]
    pub resource_group: String,
    #[schema(example = "IN_PROGRESS")]
    pub status: String,
    #[schema(value_type = Object)]
    pub options: JsonValue,
    /// `{code, message}` for failed jobs
    #[schema(value_type = Option<Object>)]
    pub error: Option<JsonValue>,
    #[schema(example = "2024-01-15T10:30:00Z")]
    pub created_at: String,
    pub finished_at: Option<String>,
}

impl From<job::Model> for JobInfo {
    fn from(model: job::Model) -> Self {
        Self {
            job_id: model.id.to_string(),
            domain_id: model.domain_id,
            workspace_id: model.workspace_id,
            trusted_account_id: model.trusted_account_id.to_string(),
            plugin_id: model.plugin_id,
            resource_group: model.resource_group,
            status: model.status,
            options: model.options,
            error: model.error,
            created_at: model.created_at.to_rfc3339(),
            finished_at: model.finished_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

/// Response payload for jobs listing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobsResponse {
    pub jobs: Vec<JobInfo>,
    /// Jobs in the domain, ignoring filters
    pub total_count: u64,
}

/// Lists jobs of a domain, newest first.
#[utoipa::path(
    get,
    path = "/jobs",
    params(ListJobsQuery, crate::handlers::DomainHeader),
    responses(
        (status = 200, description = "Jobs of the domain", body = JobsResponse),
        (status = 400, description = "Invalid query parameters", body = ApiError)
    ),
    tag = "jobs"
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    DomainId(domain_id): DomainId,
    Query(params): Query<ListJobsQuery>,
) -> Result<Json<JobsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(validation_error(
            "Invalid limit",
            serde_json::json!({ "limit": format!("Must be between 1 and {MAX_LIMIT}") }),
        ));
    }

    let filter = JobFilter {
        domain_id: domain_id.clone(),
        job_id: params.job_id,
        status: params.status,
        trusted_account_id: params.trusted_account_id,
        plugin_id: params.plugin_id,
        workspace_id: params.workspace_id,
        limit: Some(limit),
        offset: params.offset,
    };

    let ledger = state.jobs.ledger();
    let jobs = ledger.list_jobs(&filter).await?;
    let total_count = ledger.stat_jobs(&domain_id).await?.total;

    Ok(Json(JobsResponse {
        jobs: jobs.into_iter().map(JobInfo::from).collect(),
        total_count,
    }))
}

/// Counts the domain's jobs per status.
#[utoipa::path(
    get,
    path = "/jobs/stats",
    params(crate::handlers::DomainHeader),
    responses(
        (status = 200, description = "Job counts", body = JobStats)
    ),
    tag = "jobs"
)]
pub async fn job_stats(
    State(state): State<AppState>,
    DomainId(domain_id): DomainId,
) -> Result<Json<JobStats>, ApiError> {
    Ok(Json(state.jobs.ledger().stat_jobs(&domain_id).await?))
}

#[utoipa::path(
    get,
    path = "/jobs/{job_id}",
    params(
        ("job_id" = Uuid, Path, description = "Job identifier"),
        crate::handlers::DomainHeader
    ),
    responses(
        (status = 200, description = "The job", body = JobInfo),
        (status = 404, description = "Job not found", body = ApiError)
    ),
    tag = "jobs"
)]
pub async fn get_job(
    State(state): State<AppState>,
    DomainId(domain_id): DomainId,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobInfo>, ApiError> {
    let job = state.jobs.ledger().get_job(&domain_id, job_id, None).await?;
    Ok(Json(job.into()))
}

/// Cancels a pending or running job; terminal jobs are returned unchanged.
#[utoipa::path(
    post,
    path = "/jobs/{job_id}/cancel",
    params(
        ("job_id" = Uuid, Path, description = "Job identifier"),
        crate::handlers::DomainHeader
    ),
    responses(
        (status = 200, description = "Job after the cancel request", body = JobInfo),
        (status = 404, description = "Job not found", body = ApiError)
    ),
    tag = "jobs"
)]
pub async fn cancel_job(
    State(state): State<AppState>,
    DomainId(domain_id): DomainId,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobInfo>, ApiError> {
    let job = state.jobs.ledger().cancel(&domain_id, job_id).await?;
    Ok(Json(job.into()))
}

#[utoipa::path(
    delete,
    path = "/jobs/{job_id}",
    params(
        ("job_id" = Uuid, Path, description = "Job identifier"),
        crate::handlers::DomainHeader
    ),
    responses(
        (status = 204, description = "Job deleted"),
        (status = 404, description = "Job not found", body = ApiError)
    ),
    tag = "jobs"
)]
pub async fn delete_job(
    State(state): State<AppState>,
    DomainId(domain_id): DomainId,
    Path(job_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.jobs.ledger().delete_job(&domain_id, job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
