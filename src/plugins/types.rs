//! Plugin wire types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::secrets::SecretPayload;

/// Resolved plugin address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEndpoint {
    pub plugin_id: String,
    /// Base URL; calls are made to `<endpoint>/account-collector/...`
    pub endpoint: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// One step of a record's placement, root first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationNode {
    pub name: String,
    pub resource_id: String,
}

/// A provider account reported by a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredRecord {
    pub name: String,
    pub resource_id: String,
    #[serde(default)]
    pub location: Vec<LocationNode>,
    #[serde(default)]
    pub tags: Map<String, JsonValue>,
    #[serde(default)]
    pub data: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_data: Option<SecretPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_schema_id: Option<String>,
}

impl DiscoveredRecord {
    /// Secret material worth rotating; an empty object counts as none.
    pub fn secret_material(&self) -> Option<&SecretPayload> {
        self.secret_data.as_ref().filter(|data| !data.is_empty())
    }
}

/// Body of an `account-collector/sync` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub options: Map<String, JsonValue>,
    pub secret_data: SecretPayload,
    pub domain_id: String,
    #[serde(default)]
    pub schema_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    #[serde(default)]
    pub results: Vec<DiscoveredRecord>,
}
