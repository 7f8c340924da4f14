//! Service account entity model
//!
//! The leaf of the inventory: one provider account, with `secret_id` pointing
//! at the credential currently attached to it.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "service_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub domain_id: String,

    pub workspace_id: Uuid,

    pub project_id: Uuid,

    pub provider: String,

    pub name: String,

    /// Provider-native account id
    pub reference_id: String,

    /// Plugin-supplied attributes
    #[sea_orm(column_type = "JsonBinary")]
    pub data: JsonValue,

    #[sea_orm(column_type = "JsonBinary")]
    pub tags: JsonValue,

    /// Schema the attached secret was validated against
    pub schema_id: Option<String>,

    pub secret_id: Option<Uuid>,

    pub is_managed: bool,

    pub trusted_account_id: Option<Uuid>,

    pub last_synced_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
