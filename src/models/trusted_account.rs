//! Trusted account entity model
//!
//! A trusted account binds a provider credential (`trusted_secret_id`) to an
//! hourly sync schedule. The typed views ([`ScopeKind`], [`Schedule`],
//! [`SyncOptions`]) are what the orchestrator works with; the raw columns
//! stay JSON so operators can edit them without migrations.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use utoipa::ToSchema;
use uuid::Uuid;

/// Trusted account entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "trusted_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning domain
    pub domain_id: String,

    /// Owning workspace, only set for `WORKSPACE` accounts
    pub workspace_id: Option<Uuid>,

    /// `DOMAIN` or `WORKSPACE`, see [`ScopeKind`]
    pub resource_group: String,

    pub name: String,

    /// Provider identifier (references `providers.provider`)
    pub provider: String,

    /// Schema the trusted secret must satisfy
    pub secret_schema_id: String,

    /// Credential used to talk to the provider
    pub trusted_secret_id: Option<Uuid>,

    /// Whether the hourly sweep picks this account up
    pub schedule_enabled: bool,

    /// JSON array of UTC hours (0-23)
    #[sea_orm(column_type = "JsonBinary")]
    pub schedule_hours: JsonValue,

    /// See [`SyncOptions`]
    #[sea_orm(column_type = "JsonBinary")]
    pub sync_options: Option<JsonValue>,

    /// Account-level plugin options, merged over the provider's
    #[sea_orm(column_type = "JsonBinary")]
    pub plugin_options: Option<JsonValue>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Ownership scope of a trusted account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeKind {
    /// Domain-wide: discovered records create or resolve their own workspace.
    Domain,
    /// Bound to one workspace: every record lands inside it.
    Workspace,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Domain => "DOMAIN",
            ScopeKind::Workspace => "WORKSPACE",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown resource group '{0}'")]
pub struct UnknownScope(pub String);

impl FromStr for ScopeKind {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DOMAIN" => Ok(ScopeKind::Domain),
            "WORKSPACE" => Ok(ScopeKind::Workspace),
            other => Err(UnknownScope(other.to_string())),
        }
    }
}

/// Hourly sync schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub enabled: bool,
    pub hours: BTreeSet<u8>,
}

impl Schedule {
    pub fn new(enabled: bool, hours: impl IntoIterator<Item = u8>) -> Self {
        Self {
            enabled,
            hours: hours.into_iter().filter(|h| *h < 24).collect(),
        }
    }

    pub fn is_due(&self, hour: u8) -> bool {
        self.enabled && self.hours.contains(&hour)
    }

    /// JSON array stored in `trusted_accounts.schedule_hours`.
    pub fn hours_json(&self) -> JsonValue {
        JsonValue::Array(self.hours.iter().map(|h| JsonValue::from(*h)).collect())
    }
}

/// Per-account reconciliation switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SyncOptions {
    /// Collapse discovered folder ancestry instead of mirroring it as project groups.
    pub skip_project_group: bool,
    /// Place every record into this workspace instead of deriving one from the location.
    pub single_workspace_id: Option<Uuid>,
}

impl Model {
    pub fn scope(&self) -> Result<ScopeKind, UnknownScope> {
        self.resource_group.parse()
    }

    /// Schedule view; hours outside 0-23 or non-numeric entries are ignored.
    pub fn schedule(&self) -> Schedule {
        let hours = self
            .schedule_hours
            .as_array()
            .map(|hours| {
                hours
                    .iter()
                    .filter_map(JsonValue::as_u64)
                    .filter_map(|h| u8::try_from(h).ok())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Schedule::new(self.schedule_enabled, hours)
    }

    pub fn sync_options(&self) -> Result<SyncOptions, serde_json::Error> {
        match &self.sync_options {
            Some(value) if !value.is_null() => serde_json::from_value(value.clone()),
            _ => Ok(SyncOptions::default()),
        }
    }

    pub fn plugin_options(&self) -> Map<String, JsonValue> {
        self.plugin_options
            .as_ref()
            .and_then(JsonValue::as_object)
            .cloned()
            .unwrap_or_default()
    }
}
