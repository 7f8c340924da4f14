//! Project entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Project type assigned to every synced project.
pub const PROJECT_TYPE_PRIVATE: &str = "PRIVATE";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub domain_id: String,

    pub workspace_id: Uuid,

    /// Innermost project group of the record's location, if any
    pub project_group_id: Option<Uuid>,

    pub name: String,

    pub project_type: String,

    /// Provider-native account id
    pub reference_id: Option<String>,

    pub is_managed: bool,

    pub trusted_account_id: Option<Uuid>,

    pub last_synced_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
