//! Job entity model
//!
//! One row per sync run of a trusted account. Status moves only through the
//! ledger's state machine (`crate::jobs::status`).

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::jobs::JobStatus;

/// Workspace scope recorded on domain-wide jobs.
pub const ALL_WORKSPACES: &str = "*";

/// Job entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub domain_id: String,

    /// Workspace uuid, or `*` for domain-wide jobs
    pub workspace_id: String,

    pub trusted_account_id: Uuid,

    /// Discovery plugin executing the job
    pub plugin_id: String,

    /// Scope of the trusted account at creation time
    pub resource_group: String,

    /// `PENDING`, `IN_PROGRESS`, `SUCCESS`, `FAILURE` or `CANCELED`
    pub status: String,

    /// Caller-supplied job options
    #[sea_orm(column_type = "JsonBinary")]
    pub options: JsonValue,

    /// `{code, message}` for failed jobs
    #[sea_orm(column_type = "JsonBinary")]
    pub error: Option<JsonValue>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    /// Set on every terminal transition
    pub finished_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    pub fn job_status(&self) -> Result<JobStatus, serde_json::Error> {
        serde_json::from_value(JsonValue::String(self.status.clone()))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::job_dispatch::Entity")]
    JobDispatch,
}

impl Related<super::job_dispatch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobDispatch.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
