//! Job dispatch entity model
//!
//! Durable queue row carrying one sealed `JobDispatchMessage`.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

pub const STATUS_QUEUED: &str = "queued";
pub const STATUS_CLAIMED: &str = "claimed";
pub const STATUS_DONE: &str = "done";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "job_dispatches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub job_id: Uuid,

    /// `queued`, `claimed` or `done`
    pub status: String,

    /// Number of times the message has been claimed
    pub attempts: i32,

    /// Sealed message, AAD bound to `id`
    pub payload: Vec<u8>,

    /// Earliest time a worker may claim the row
    pub available_at: DateTimeWithTimeZone,

    pub claimed_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::job::Entity",
        from = "Column::JobId",
        to = "super::job::Column::Id"
    )]
    Job,
}

impl Related<super::job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Job.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
