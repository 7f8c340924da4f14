//! Secret schema entity model
//!
//! Describes the shape a credential payload must have for a given usage.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "secret_schemas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub schema_id: String,

    pub name: String,

    /// Usage kind, e.g. `SECRET` or `TRUSTING_SECRET`
    pub usage: String,

    /// JSON array of field names that must be present and non-empty
    #[sea_orm(column_type = "JsonBinary")]
    pub required_fields: JsonValue,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn required_fields(&self) -> Vec<String> {
        self.required_fields
            .as_array()
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
