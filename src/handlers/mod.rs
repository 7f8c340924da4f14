//! # API Handlers
//!
//! HTTP endpoints of the account sync service: service info and health, the
//! schedule/sync triggers, and job inspection and control.

use axum::{extract::FromRequestParts, http::request::Parts, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::error::{ApiError, validation_error};
use crate::models::ServiceInfo;

pub mod health;
pub mod jobs;
pub mod trigger;

/// Header scoping a request to one domain.
pub const DOMAIN_HEADER: &str = "X-Domain-Id";

/// Domain the request operates on, taken from [`DOMAIN_HEADER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainId(pub String);

impl<S> FromRequestParts<S> for DomainId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(DOMAIN_HEADER)
            .ok_or_else(|| {
                validation_error(
                    "Missing required header",
                    serde_json::json!({ DOMAIN_HEADER: "Required header is missing" }),
                )
            })?
            .to_str()
            .map_err(|_| {
                validation_error(
                    "Invalid domain header",
                    serde_json::json!({ DOMAIN_HEADER: "Header must be valid UTF-8" }),
                )
            })?
            .trim();

        if value.is_empty() {
            return Err(validation_error(
                "Invalid domain header",
                serde_json::json!({ DOMAIN_HEADER: "Header must not be empty" }),
            ));
        }
        Ok(DomainId(value.to_string()))
    }
}

/// OpenAPI header parameter for X-Domain-Id
#[derive(Debug, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Header)]
pub struct DomainHeader {
    /// Domain that owns the trusted accounts and jobs
    #[serde(rename = "X-Domain-Id")]
    #[param(rename = "X-Domain-Id")]
    pub domain_id: String,
}

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}
