//! Provider entity model
//!
//! Catalog of resource providers (cloud vendors and similar). `plugin_info`
//! names the discovery plugin that knows how to enumerate the provider.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Provider entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "providers")]
pub struct Model {
    /// Provider identifier, e.g. `aws` (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub provider: String,

    /// Display name
    pub name: String,

    /// Discovery plugin binding, see [`PluginInfo`]
    #[sea_orm(column_type = "JsonBinary")]
    pub plugin_info: Option<JsonValue>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

/// Typed view over `providers.plugin_info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    #[serde(default)]
    pub plugin_id: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Provider-level plugin options; trusted-account options override them.
    #[serde(default)]
    pub options: Map<String, JsonValue>,
    /// Schema id handed to the plugin's sync call.
    #[serde(default)]
    pub schema_id: Option<String>,
}

impl Model {
    /// Parses `plugin_info`, treating a missing or malformed document as empty.
    pub fn plugin_info(&self) -> PluginInfo {
        self.plugin_info
            .clone()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
