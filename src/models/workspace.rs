//! Workspace entity model
//!
//! Top level of the managed inventory. A workspace can absorb several
//! provider-side folders; their ids are tracked in `references`.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "workspaces")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub domain_id: String,

    pub name: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub tags: JsonValue,

    /// JSON array of provider ids mapped onto this workspace
    #[sea_orm(column_name = "reference_ids", column_type = "JsonBinary")]
    pub references: JsonValue,

    pub is_managed: bool,

    pub trusted_account_id: Option<Uuid>,

    pub last_synced_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn reference_ids(&self) -> Vec<String> {
        self.references
            .as_array()
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| id.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_reference(&self, reference_id: &str) -> bool {
        self.references
            .as_array()
            .is_some_and(|ids| ids.iter().any(|id| id.as_str() == Some(reference_id)))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
