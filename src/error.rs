//! # Error Handling
//!
//! Two layers live here: [`SyncError`], the orchestrator's own failure
//! taxonomy (its `code()` is what ends up in a failed job's `error` column), and
//! [`ApiError`], the problem+json envelope returned by the HTTP surface.

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::crypto::CryptoError;
use crate::jobs::JobStatus;
use crate::telemetry;

/// Failures raised while creating, dispatching or executing sync jobs.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A newer in-progress job already covers this account and workspace.
    #[error("job {existing_job_id} is already in progress for this trusted account")]
    DuplicateJob { existing_job_id: Uuid },
    /// The trusted credential could not be fetched or failed validation.
    #[error("failed to resolve trusted secret: {0}")]
    SecretResolution(String),
    #[error("plugin invocation failed: {0}")]
    PluginInvocation(String),
    #[error("reconciliation failed: {0}")]
    Reconciliation(String),
    #[error("secret validation failed: {0}")]
    SecretValidation(String),
    #[error("job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code recorded on failed jobs.
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::DuplicateJob { .. } => "ERROR_DUPLICATE_JOB",
            SyncError::SecretResolution(_) => "ERROR_SECRET_RESOLUTION",
            SyncError::PluginInvocation(_) => "ERROR_PLUGIN_INVOCATION",
            SyncError::Reconciliation(_) => "ERROR_RECONCILIATION",
            SyncError::SecretValidation(_) => "ERROR_SECRET_VALIDATION",
            SyncError::InvalidTransition { .. } => "ERROR_INVALID_TRANSITION",
            SyncError::NotFound { .. } => "ERROR_NOT_FOUND",
            SyncError::Database(_) => "ERROR_DATABASE",
            SyncError::Crypto(_) => "ERROR_CRYPTO",
            SyncError::Serialization(_) => "ERROR_SERIALIZATION",
        }
    }

    /// `{code, message}` document stored in `jobs.error`.
    pub fn to_error_document(&self) -> serde_json::Value {
        json!({
            "code": self.code(),
            "message": self.to_string(),
        })
    }
}

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                Some(format!("corr-{}", &Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

/// Whether a database error is a unique-constraint violation on any supported backend.
pub fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    db_error
        .code()
        .map(|code| code.as_ref() == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code.as_ref()))
        .unwrap_or(false)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        (self.status, headers, axum::Json(self)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique constraint violation detected");
            return Self::new(StatusCode::CONFLICT, "CONFLICT", "Resource already exists");
        }

        match error {
            sea_orm::DbErr::RecordNotFound(record) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("Record not found: {}", record),
            ),
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
            }
            other => {
                tracing::error!("Database error: {:?}", other);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(error: SyncError) -> Self {
        let message = error.to_string();
        match error {
            SyncError::Database(db) => db.into(),
            SyncError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", &message),
            SyncError::DuplicateJob { existing_job_id } => {
                Self::new(StatusCode::CONFLICT, "DUPLICATE_JOB", &message)
                    .with_details(json!({ "existing_job_id": existing_job_id }))
            }
            SyncError::InvalidTransition { from, to, .. } => {
                Self::new(StatusCode::CONFLICT, "INVALID_TRANSITION", &message)
                    .with_details(json!({ "from": from, "to": to }))
            }
            SyncError::SecretValidation(_) | SyncError::SecretResolution(_) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "SECRET_INVALID", &message)
            }
            SyncError::PluginInvocation(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "PLUGIN_ERROR", &message)
            }
            other => {
                tracing::error!(error = %other, code = other.code(), "sync error surfaced to API");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "An internal error occurred",
                )
            }
        }
    }
}

/// Create a validation error with field details
pub fn validation_error(message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message).with_details(field_errors)
}
