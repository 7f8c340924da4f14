//! # Trigger Handlers
//!
//! External entry points that create jobs: the hourly schedule sweep and an
//! on-demand sync of one trusted account.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, validation_error};
use crate::handlers::DomainId;
use crate::handlers::jobs::JobInfo;
use crate::jobs::SweepReport;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct ScheduleTickRequest {
    /// UTC hour to sweep (0-23); defaults to the current hour
    #[schema(example = 9)]
    pub current_hour: Option<u8>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct SyncTrustedAccountRequest {
    /// Options stored on the job and forwarded in its dispatch message
    #[serde(default)]
    #[schema(value_type = Object)]
    pub options: Option<JsonValue>,
}

/// Runs the schedule sweep for one hour.
#[utoipa::path(
    post,
    path = "/schedule/tick",
    request_body = ScheduleTickRequest,
    responses(
        (status = 200, description = "Sweep finished", body = SweepReport),
        (status = 400, description = "Invalid hour", body = ApiError)
    ),
    tag = "schedule"
)]
pub async fn schedule_tick(
    State(state): State<AppState>,
    body: Option<Json<ScheduleTickRequest>>,
) -> Result<Json<SweepReport>, ApiError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    if let Some(hour) = request.current_hour {
        if hour > 23 {
            return Err(validation_error(
                "Invalid hour",
                json!({ "current_hour": "Must be between 0 and 23" }),
            ));
        }
    }

    let report = state
        .jobs
        .create_jobs_by_trusted_account(request.current_hour)
        .await?;
    Ok(Json(report))
}

/// Creates a sync job for one trusted account.
#[utoipa::path(
    post,
    path = "/trusted-accounts/{trusted_account_id}/sync",
    params(
        ("trusted_account_id" = Uuid, Path, description = "Trusted account to sync"),
        crate::handlers::DomainHeader
    ),
    request_body(content = SyncTrustedAccountRequest, content_type = "application/json"),
    responses(
        (status = 202, description = "Job created", body = JobInfo),
        (status = 404, description = "Trusted account not found", body = ApiError)
    ),
    tag = "jobs"
)]
pub async fn sync_trusted_account(
    State(state): State<AppState>,
    DomainId(domain_id): DomainId,
    Path(trusted_account_id): Path<Uuid>,
    body: Option<Json<SyncTrustedAccountRequest>>,
) -> Result<(StatusCode, Json<JobInfo>), ApiError> {
    let options = body
        .and_then(|Json(request)| request.options)
        .unwrap_or_else(|| json!({}));

    let account = state
        .jobs
        .accounts()
        .get(&domain_id, trusted_account_id)
        .await?;
    let job = state
        .jobs
        .create_service_account_job(&account, options)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(JobInfo::from(job))))
}
