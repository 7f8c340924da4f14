//! # Data Models
//!
//! SeaORM entities for the provider catalog, credentials, the managed
//! inventory hierarchy and the job/dispatch ledger.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod job;
pub mod job_dispatch;
pub mod project;
pub mod project_group;
pub mod provider;
pub mod secret;
pub mod secret_schema;
pub mod service_account;
pub mod trusted_account;
pub mod workspace;

pub use job::Entity as Job;
pub use job_dispatch::Entity as JobDispatch;
pub use project::Entity as Project;
pub use project_group::Entity as ProjectGroup;
pub use provider::Entity as Provider;
pub use secret::Entity as Secret;
pub use secret_schema::Entity as SecretSchema;
pub use service_account::Entity as ServiceAccount;
pub use trusted_account::Entity as TrustedAccount;
pub use workspace::Entity as Workspace;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "account-sync".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
